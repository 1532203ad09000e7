//! Reassembly of chained (multi-telegram) messages.
//!
//! A long manufacturer-specific message is split over several radio
//! telegrams sharing a sequence number. The first fragment (index 0)
//! declares the total length; continuation fragments add payload until the
//! declared length is reached.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use bytes::Bytes;
use serde::Serialize;

use crate::address::Address;
use crate::rorg::{CHAINED, CHAINED_PROPRIETARY, MSC};

/// Shortest fragment: header byte pair, sender, status and two payload bytes.
pub const MIN_FRAGMENT_LEN: usize = 8;

/// The two chained framings seen on air.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainFraming {
    /// Category 0xC8. Big-endian length; the reassembled message gets an MSC
    /// category byte prepended.
    Standard,
    /// Category 0x40. Length written as the decimal digits of two bytes
    /// (`0x00 0x11` means 17); the payload already starts with its category.
    Proprietary,
}

impl ChainFraming {
    pub fn from_rorg(rorg: u8) -> Option<Self> {
        match rorg {
            CHAINED => Some(Self::Standard),
            CHAINED_PROPRIETARY => Some(Self::Proprietary),
            _ => None,
        }
    }

    fn declared_len(self, hi: u8, lo: u8) -> usize {
        match self {
            Self::Standard => usize::from(u16::from_be_bytes([hi, lo])),
            Self::Proprietary => {
                if hi >= 100 || lo >= 100 {
                    tracing::warn!(hi, lo, "proprietary chain length byte outside two digits");
                }
                format!("{hi}{lo}").parse().unwrap_or(0)
            }
        }
    }
}

/// One parsed chain fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainFragment {
    pub framing: ChainFraming,
    /// Sequence number shared by all fragments of one message (high nibble
    /// of the second byte).
    pub sequence: u8,
    /// Position within the message (low nibble of the second byte).
    pub index: u8,
    /// Total message length, present on the first fragment only.
    pub declared_len: Option<usize>,
    pub payload: Bytes,
    pub sender: Address,
    pub optional: Bytes,
}

impl ChainFragment {
    /// Parse a chained telegram. Returns `None` for a non-chained category
    /// or a telegram shorter than [`MIN_FRAGMENT_LEN`].
    pub fn parse(data: &Bytes, optional: &Bytes) -> Option<Self> {
        let framing = ChainFraming::from_rorg(*data.first()?)?;
        if data.len() < MIN_FRAGMENT_LEN {
            tracing::debug!(len = data.len(), "chain fragment too short");
            return None;
        }
        let len = data.len();
        let sequence = data[1] >> 4;
        let index = data[1] & 0x0F;
        let sender = Address::from_slice(&data[len - 5..len - 1])?;

        let (declared_len, payload) = if index == 0 {
            let declared = framing.declared_len(data[2], data[3]);
            (Some(declared), data.slice(4..len - 5))
        } else {
            (None, data.slice(2..len - 5))
        };

        Some(Self {
            framing,
            sequence,
            index,
            declared_len,
            payload,
            sender,
            optional: optional.clone(),
        })
    }

    /// Key identifying the message this fragment belongs to.
    pub fn key(&self) -> (Address, u8) {
        (self.sender, self.sequence)
    }
}

/// Chain store limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainConfig {
    /// Maximum number of messages awaiting continuation fragments.
    pub max_pending: usize,
    /// Pending messages older than this are dropped.
    pub max_age: Duration,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            max_pending: 32,
            max_age: Duration::from_secs(30),
        }
    }
}

/// A fully reassembled message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedChain {
    pub framing: ChainFraming,
    pub sender: Address,
    pub sequence: u8,
    /// Number of fragments that made up the message.
    pub fragments: usize,
    pub declared_len: usize,
    /// Radio data of the reassembled telegram: payload, sender and a zero
    /// status byte.
    pub data: Bytes,
    /// Optional data of the first fragment.
    pub optional: Bytes,
}

/// Result of feeding one fragment to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainProgress {
    /// Message incomplete; `received` payload bytes so far.
    Pending {
        sender: Address,
        sequence: u8,
        received: usize,
        declared_len: usize,
    },
    /// Message complete.
    Complete(CompletedChain),
    /// Continuation fragment without a pending first fragment; dropped.
    Orphaned {
        sender: Address,
        sequence: u8,
        index: u8,
    },
}

#[derive(Debug)]
struct PendingChain {
    framing: ChainFraming,
    declared_len: usize,
    payload: Vec<u8>,
    optional: Bytes,
    fragments: usize,
    started: Instant,
}

/// Pending chained messages keyed by `(sender, sequence)`.
#[derive(Debug, Default)]
pub struct ChainStore {
    pending: HashMap<(Address, u8), PendingChain>,
    config: ChainConfig,
}

impl ChainStore {
    pub fn new() -> Self {
        Self::with_config(ChainConfig::default())
    }

    pub fn with_config(config: ChainConfig) -> Self {
        Self {
            pending: HashMap::new(),
            config,
        }
    }

    /// Feed a fragment received now.
    pub fn accept(&mut self, fragment: ChainFragment) -> ChainProgress {
        self.accept_at(fragment, Instant::now())
    }

    /// Feed a fragment received at `now`.
    pub fn accept_at(&mut self, fragment: ChainFragment, now: Instant) -> ChainProgress {
        self.purge_expired(now);
        let key = fragment.key();

        if let Some(declared_len) = fragment.declared_len {
            if self.pending.contains_key(&key) {
                tracing::debug!(sender = %key.0, sequence = key.1, "chain restarted");
            } else if self.pending.len() >= self.config.max_pending {
                self.evict_oldest();
            }
            let entry = PendingChain {
                framing: fragment.framing,
                declared_len,
                payload: fragment.payload.to_vec(),
                optional: fragment.optional,
                fragments: 1,
                started: now,
            };
            let received = entry.payload.len();
            self.pending.insert(key, entry);
            tracing::debug!(
                sender = %key.0,
                sequence = key.1,
                declared_len,
                received,
                "chain started"
            );
            return ChainProgress::Pending {
                sender: key.0,
                sequence: key.1,
                received,
                declared_len,
            };
        }

        let Some(entry) = self.pending.get_mut(&key) else {
            tracing::warn!(
                sender = %key.0,
                sequence = key.1,
                index = fragment.index,
                "orphan chain fragment dropped"
            );
            return ChainProgress::Orphaned {
                sender: key.0,
                sequence: key.1,
                index: fragment.index,
            };
        };

        entry.payload.extend_from_slice(&fragment.payload);
        entry.fragments += 1;
        if entry.payload.len() < entry.declared_len {
            return ChainProgress::Pending {
                sender: key.0,
                sequence: key.1,
                received: entry.payload.len(),
                declared_len: entry.declared_len,
            };
        }

        let Some(entry) = self.pending.remove(&key) else {
            return ChainProgress::Orphaned {
                sender: key.0,
                sequence: key.1,
                index: fragment.index,
            };
        };
        let completed = complete(entry, key);
        tracing::info!(
            sender = %completed.sender,
            sequence = completed.sequence,
            fragments = completed.fragments,
            len = completed.declared_len,
            "chain complete"
        );
        ChainProgress::Complete(completed)
    }

    /// Drop pending messages older than the configured age.
    pub fn purge_expired(&mut self, now: Instant) -> usize {
        let max_age = self.config.max_age;
        let before = self.pending.len();
        self.pending.retain(|(sender, sequence), entry| {
            let keep = now.saturating_duration_since(entry.started) <= max_age;
            if !keep {
                tracing::debug!(%sender, sequence, "pending chain expired");
            }
            keep
        });
        before - self.pending.len()
    }

    fn evict_oldest(&mut self) {
        let oldest = self
            .pending
            .iter()
            .min_by_key(|(_, entry)| entry.started)
            .map(|(key, _)| *key);
        if let Some(key) = oldest {
            self.pending.remove(&key);
            tracing::warn!(
                sender = %key.0,
                sequence = key.1,
                max_pending = self.config.max_pending,
                "chain store full, evicted oldest pending chain"
            );
        }
    }

    pub fn contains(&self, sender: Address, sequence: u8) -> bool {
        self.pending.contains_key(&(sender, sequence))
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }
}

fn complete(entry: PendingChain, key: (Address, u8)) -> CompletedChain {
    let mut payload = entry.payload;
    payload.truncate(entry.declared_len);

    let mut data = Vec::with_capacity(payload.len() + 6);
    if entry.framing == ChainFraming::Standard {
        data.push(MSC);
    }
    data.extend_from_slice(&payload);
    data.extend_from_slice(key.0.as_bytes());
    data.push(0x00);

    CompletedChain {
        framing: entry.framing,
        sender: key.0,
        sequence: key.1,
        fragments: entry.fragments,
        declared_len: entry.declared_len,
        data: Bytes::from(data),
        optional: entry.optional,
    }
}
