//! In-process message queue used by communicating strategies.

use serde::{Deserialize, Serialize};

use crate::{RobotId, Role, Tier};

/// Message kinds exchanged between robots of the same process step.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Message {
    /// Identification query announcing the sender's role.
    Identify { role: Role, tier: Tier },
    /// Broadcast notice that the tier's exploration has concluded.
    ExplorationFinished,
}

/// Unicast delivery record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Envelope {
    pub from: RobotId,
    pub to: RobotId,
    pub message: Message,
}

impl Envelope {
    #[must_use]
    pub const fn new(from: RobotId, to: RobotId, message: Message) -> Self {
        Self { from, to, message }
    }
}

/// Pending messages owned by the step driver.
///
/// Messages stay queued until their recipient's next turn, so a robot that has
/// already acted this tick reads them on the following tick.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Mailbox {
    pending: Vec<Envelope>,
    delivered: u64,
}

impl Mailbox {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn post(&mut self, envelope: Envelope) {
        self.pending.push(envelope);
    }

    pub fn post_all(&mut self, envelopes: impl IntoIterator<Item = Envelope>) {
        self.pending.extend(envelopes);
    }

    /// Remove and return every message addressed to `robot`, in send order.
    pub fn take_for(&mut self, robot: RobotId) -> Vec<Envelope> {
        let mut inbox = Vec::new();
        self.pending.retain(|envelope| {
            if envelope.to == robot {
                inbox.push(*envelope);
                false
            } else {
                true
            }
        });
        self.delivered += inbox.len() as u64;
        inbox
    }

    #[must_use]
    pub fn pending(&self) -> &[Envelope] {
        &self.pending
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Total number of messages handed to recipients so far.
    #[must_use]
    pub const fn delivered(&self) -> u64 {
        self.delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_for_preserves_order_and_leaves_others() {
        let mut mailbox = Mailbox::new();
        let a = RobotId(0);
        let b = RobotId(1);
        mailbox.post(Envelope::new(a, b, Message::ExplorationFinished));
        mailbox.post(Envelope::new(
            b,
            a,
            Message::Identify {
                role: Role::TopSweeper,
                tier: Tier::Green,
            },
        ));
        mailbox.post(Envelope::new(
            a,
            b,
            Message::Identify {
                role: Role::BottomSweeper,
                tier: Tier::Green,
            },
        ));

        let inbox = mailbox.take_for(b);
        assert_eq!(inbox.len(), 2);
        assert_eq!(inbox[0].message, Message::ExplorationFinished);
        assert_eq!(mailbox.len(), 1);
        assert_eq!(mailbox.pending()[0].to, a);
        assert_eq!(mailbox.delivered(), 2);
        assert!(mailbox.take_for(b).is_empty());
    }
}
