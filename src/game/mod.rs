//! One game of battleship against the device, host side.
//!
//! Sequence: `HD_START` / `DH_START_<name>`, exchange of row checksums, then
//! alternating shots until one fleet is sunk. The loser's shot report is
//! replaced by its ten `SF` rows and both sides reveal their fields.

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::error::{Error, Result};
use crate::link::Link;
use crate::port::Transport;
use crate::proto::{FIELD_SIZE, Impact, Message, Origin, RowCounts, format_message, parse_message};
use crate::session::{Exchange, Verdict};

pub mod field;
pub mod fire;

use field::{Field, fleet_cells};
use fire::{FireSolution, RandomFire};

/// Plays one fresh game per exchange, with a new random field each time.
pub struct Battleship {
    rng: StdRng,
}

impl Battleship {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        };
        Self { rng }
    }
}

impl Exchange for Battleship {
    fn exchange<T: Transport>(&mut self, link: &mut Link<T>) -> Result<Verdict> {
        let field = Field::generate(&mut self.rng);
        log::info!("Our field:\n{}", field);

        let mut game = Game::new(link, field);
        game.handshake()?;
        let fire = RandomFire::new(StdRng::from_rng(&mut self.rng));
        game.play(fire)
    }
}

struct Game<'a, T: Transport> {
    link: &'a mut Link<T>,
    field: Field,
    their_counts: RowCounts,
}

impl<'a, T: Transport> Game<'a, T> {
    fn new(link: &'a mut Link<T>, field: Field) -> Self {
        Self {
            link,
            field,
            their_counts: RowCounts::default(),
        }
    }

    fn send(&mut self, msg: Message) -> Result<()> {
        self.link.send_line(&format_message(Origin::Host, &msg))
    }

    fn recv(&mut self) -> Result<Message> {
        let line = self.link.receive_line()?;
        match parse_message(&line)? {
            (Origin::Device, msg) => Ok(msg),
            (Origin::Host, _) => Err(Error::Protocol(format!(
                "expected a DH_ message, got echo of our own: {line}"
            ))),
        }
    }

    fn handshake(&mut self) -> Result<()> {
        self.send(Message::Start { name: None })?;
        let opponent = match self.recv()? {
            Message::Start { name: Some(name) } => name,
            other => return Err(unexpected("DH_START_<name>", &other)),
        };
        log::info!("Opponent name {}", opponent);

        self.send(Message::Checksum(self.field.row_counts()))?;
        let counts = match self.recv()? {
            Message::Checksum(counts) => counts,
            other => return Err(unexpected("DH_CS_<counts>", &other)),
        };
        log::debug!("Received opponent CS: {}", counts);
        if counts.total() != fleet_cells() {
            return Err(Error::Protocol(format!(
                "total number of reported ship parts {}, but it should be {}",
                counts.total(),
                fleet_cells()
            )));
        }
        self.their_counts = counts;
        Ok(())
    }

    fn play<F: FireSolution>(mut self, mut fire: F) -> Result<Verdict> {
        loop {
            if let Some(verdict) = self.turn(&mut fire)? {
                return Ok(verdict);
            }
        }
    }

    /// Our shot, then theirs. `Some` once the game is decided.
    fn turn<F: FireSolution>(&mut self, fire: &mut F) -> Result<Option<Verdict>> {
        let target = fire.next_target().ok_or_else(|| {
            Error::Protocol("no more fire coords, the enemy must be sunk already".into())
        })?;
        self.send(Message::Fire(target))?;

        match self.recv()? {
            Message::Report(impact) => {
                fire.record(target, impact);
                log::info!("we {} @{}", describe(impact), target);
            }
            Message::Reveal { row, cells } => {
                log::info!("we sank them with the shot @{}", target);
                let mut rows = [None; FIELD_SIZE];
                rows[row as usize] = Some(cells);
                self.collect_reveal(&mut rows)?;
                self.reveal_ours()?;
                return Ok(Some(Verdict::Won));
            }
            other => return Err(unexpected("DH_BOOM_H, DH_BOOM_M or DH_SF", &other)),
        }

        let shot = match self.recv()? {
            Message::Fire(at) => at,
            other => return Err(unexpected("DH_BOOM_<row>_<col>", &other)),
        };
        let impact = self.field.shot_at(shot);
        log::info!("they {} @{}", describe(impact), shot);
        log::info!("Our field:\n{}", self.field);

        if self.field.ships_left() == 0 {
            log::warn!("we have no ships left, we just lost the game");
            self.reveal_ours()?;
            let mut rows = [None; FIELD_SIZE];
            self.collect_reveal(&mut rows)?;
            return Ok(Some(Verdict::Lost));
        }

        self.send(Message::Report(impact))?;
        Ok(None)
    }

    fn reveal_ours(&mut self) -> Result<()> {
        let rows: Vec<_> = self.field.reveal().collect();
        for (row, cells) in rows {
            self.send(Message::Reveal { row, cells })?;
        }
        Ok(())
    }

    /// Read `SF` rows until every row has been seen, then check them.
    fn collect_reveal(&mut self, rows: &mut [Option<[u8; FIELD_SIZE]>; FIELD_SIZE]) -> Result<()> {
        let mut received = rows.iter().filter(|r| r.is_some()).count();
        while received < FIELD_SIZE {
            match self.recv()? {
                Message::Reveal { row, cells } => {
                    rows[row as usize] = Some(cells);
                    received += 1;
                }
                other => return Err(unexpected("DH_SF<row>D<cells>", &other)),
            }
        }
        self.check_reveal(rows)
    }

    fn check_reveal(&self, rows: &[Option<[u8; FIELD_SIZE]>; FIELD_SIZE]) -> Result<()> {
        let mut field = [[0u8; FIELD_SIZE]; FIELD_SIZE];
        for (i, (slot, row)) in field.iter_mut().zip(rows).enumerate() {
            *slot = row.ok_or_else(|| {
                Error::Protocol(format!("expected {FIELD_SIZE} SF records, row {i} is missing"))
            })?;
        }

        let actual = RowCounts::from_rows(&field);
        if actual != self.their_counts {
            log::error!(
                "Your CS is {} but you initially announced: {}",
                actual,
                self.their_counts
            );
        }

        log::info!("Their SF:");
        for row in &field {
            let text: String = row.iter().map(|&c| char::from(b'0' + c)).collect();
            log::info!("{}", text);
        }
        Ok(())
    }
}

fn describe(impact: Impact) -> &'static str {
    match impact {
        Impact::Hit => "HIT ",
        Impact::Miss => "MISS",
    }
}

fn unexpected(expected: &str, got: &Message) -> Error {
    Error::Protocol(format!(
        "expected {expected}, got {}",
        format_message(Origin::Device, got)
    ))
}

#[cfg(test)]
pub(crate) mod sim {
    //! A scripted opponent for driving full games through a mock transport.

    use super::*;
    use crate::proto::Coord;

    pub const SIM_ROWS: [[u8; FIELD_SIZE]; FIELD_SIZE] = [
        [5, 5, 5, 5, 5, 0, 0, 0, 0, 0],
        [0; FIELD_SIZE],
        [4, 4, 4, 4, 0, 0, 4, 4, 4, 4],
        [0; FIELD_SIZE],
        [3, 3, 3, 0, 3, 3, 3, 0, 0, 0],
        [0; FIELD_SIZE],
        [3, 3, 3, 0, 0, 0, 0, 0, 0, 0],
        [0; FIELD_SIZE],
        [2, 2, 0, 2, 2, 0, 2, 2, 0, 0],
        [2, 2, 0, 0, 0, 0, 0, 0, 0, 0],
    ];

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Style {
        /// Gives up on the first shot it receives.
        Surrender,
        /// Reports every shot as a miss and sweeps the host's field row by row.
        Sweep,
        /// Answers the start and then never says anything again.
        Mute,
        /// Answers START with garbage.
        Garbled,
    }

    /// Device side of the protocol as a responder for [`crate::mock::MockTransport`].
    pub fn opponent(style: Style) -> impl FnMut(&str) -> Vec<String> + Send + 'static {
        let mut next_shot = 0usize;
        let mut host_rows = 0usize;
        move |line: &str| {
            let dh = |msg: Message| format_message(Origin::Device, &msg);
            let reveal = || -> Vec<String> {
                (0..FIELD_SIZE)
                    .map(|row| {
                        dh(Message::Reveal {
                            row: row as u8,
                            cells: SIM_ROWS[row],
                        })
                    })
                    .collect()
            };
            let msg = match parse_message(line) {
                Ok((Origin::Host, msg)) => msg,
                _ => return Vec::new(),
            };
            match (style, msg) {
                (Style::Garbled, Message::Start { .. }) => vec!["DH_HELLO".into()],
                (_, Message::Start { .. }) => {
                    next_shot = 0;
                    host_rows = 0;
                    vec![dh(Message::Start {
                        name: Some("sim".into()),
                    })]
                }
                (Style::Mute, _) => Vec::new(),
                (_, Message::Checksum(_)) => {
                    vec![dh(Message::Checksum(RowCounts::from_rows(&SIM_ROWS)))]
                }
                (Style::Surrender, Message::Fire(_)) => reveal(),
                (_, Message::Fire(_)) => {
                    let at = Coord::new((next_shot / FIELD_SIZE) as u8, (next_shot % FIELD_SIZE) as u8);
                    next_shot += 1;
                    vec![dh(Message::Report(Impact::Miss)), dh(Message::Fire(at))]
                }
                (_, Message::Reveal { .. }) => {
                    host_rows += 1;
                    if style == Style::Sweep && host_rows == FIELD_SIZE {
                        reveal()
                    } else {
                        Vec::new()
                    }
                }
                _ => Vec::new(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::sim::{Style, opponent};
    use super::*;
    use crate::mock::MockTransport;
    use std::time::Duration;

    fn link_to(style: Style) -> (MockTransport, Link<MockTransport>) {
        let mock = MockTransport::with_responder(opponent(style));
        let link = Link::new(mock.clone(), Some(Duration::from_millis(10)));
        (mock, link)
    }

    #[test]
    fn wins_when_opponent_reveals() {
        let (mock, mut link) = link_to(Style::Surrender);
        let verdict = Battleship::new(Some(1)).exchange(&mut link).unwrap();
        assert_eq!(verdict, Verdict::Won);

        let lines = mock.sent_lines();
        assert_eq!(lines[0], "HD_START");
        assert!(lines[1].starts_with("HD_CS_"));
        assert!(lines[2].starts_with("HD_BOOM_"));
        let reveals: Vec<_> = lines.iter().filter(|l| l.starts_with("HD_SF")).collect();
        assert_eq!(reveals.len(), FIELD_SIZE);
        assert!(reveals[0].starts_with("HD_SF0D"));
        assert_eq!(lines.len(), 3 + FIELD_SIZE);
    }

    #[test]
    fn loses_when_fleet_is_swept() {
        let (mock, mut link) = link_to(Style::Sweep);
        let verdict = Battleship::new(Some(2)).exchange(&mut link).unwrap();
        assert_eq!(verdict, Verdict::Lost);

        let lines = mock.sent_lines();
        // Our report of their last shot is replaced by the reveal.
        let tail = &lines[lines.len() - FIELD_SIZE..];
        assert!(tail.iter().all(|l| l.starts_with("HD_SF")));
        assert!(lines[lines.len() - FIELD_SIZE - 1].starts_with("HD_BOOM_"));
        let reports = lines.iter().filter(|l| *l == "HD_BOOM_H" || *l == "HD_BOOM_M").count();
        let shots = lines.len() - 2 - FIELD_SIZE - reports;
        assert_eq!(shots, reports + 1);
        assert!(reports >= 29);
    }

    #[test]
    fn silent_device_times_out() {
        let (_mock, mut link) = link_to(Style::Mute);
        let err = Battleship::new(Some(3)).exchange(&mut link).unwrap_err();
        assert!(matches!(err, Error::Timeout));
    }

    #[test]
    fn garbled_start_is_a_protocol_error() {
        let (_mock, mut link) = link_to(Style::Garbled);
        let err = Battleship::new(Some(4)).exchange(&mut link).unwrap_err();
        assert!(err.is_recoverable());
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn rejects_wrong_ship_total() {
        let mock = MockTransport::with_responder(|line: &str| match line {
            "HD_START" => vec!["DH_START_cheater".into()],
            l if l.starts_with("HD_CS_") => vec!["DH_CS_9999999999".into()],
            _ => Vec::new(),
        });
        let mut link = Link::new(mock, Some(Duration::from_millis(10)));
        let err = Battleship::new(Some(5)).exchange(&mut link).unwrap_err();
        assert!(matches!(err, Error::Protocol(ref m) if m.contains("90")), "{err}");
    }

    #[test]
    fn incomplete_reveal_is_a_protocol_error() {
        let mock = MockTransport::with_responder(|line: &str| match line {
            "HD_START" => vec!["DH_START_x".into()],
            l if l.starts_with("HD_CS_") => vec!["DH_CS_5080603062".into()],
            l if l.starts_with("HD_BOOM_") => vec!["DH_SF0D5555500000".into(), "DH_BOOM_H".into()],
            _ => Vec::new(),
        });
        let mut link = Link::new(mock, Some(Duration::from_millis(10)));
        let err = Battleship::new(Some(6)).exchange(&mut link).unwrap_err();
        assert!(matches!(err, Error::Protocol(_)), "{err}");
    }

    #[test]
    fn reveal_contradicting_checksum_still_counts_as_won() {
        let mut honest = opponent(Style::Surrender);
        let mock = MockTransport::with_responder(move |line: &str| {
            let mut replies = honest(line);
            for reply in &mut replies {
                if *reply == "DH_CS_5080603062" {
                    // Same total, first two rows swapped.
                    *reply = "DH_CS_0580603062".into();
                }
            }
            replies
        });
        let mut link = Link::new(mock.clone(), Some(Duration::from_millis(10)));
        let verdict = Battleship::new(Some(10)).exchange(&mut link).unwrap();
        assert_eq!(verdict, Verdict::Won);
        let reveals = mock.sent_lines().iter().filter(|l| l.starts_with("HD_SF")).count();
        assert_eq!(reveals, FIELD_SIZE);
    }
}
