use std::collections::HashMap;
use std::sync::Arc;

use bytes::BytesMut;
use esp3_eep::{ProfileCatalog, ProfileId};
use esp3_frame::{decode_frame, Frame, RADIO_ERP1};

use crate::address::Address;
use crate::chain::{ChainConfig, ChainFragment, ChainProgress, ChainStore};
use crate::error::Result;
use crate::packet::{ChainedInfo, Packet, PacketKind};
use crate::rorg;
use crate::teach_in::TeachInRequest;

/// Shared profile catalog handle.
pub type SharedCatalog = Arc<dyn ProfileCatalog + Send + Sync>;

/// Decoder behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecoderConfig {
    pub chain: ChainConfig,
    /// Bind senders to the profile they announce in a teach-in telegram.
    pub learn_from_teach_in: bool,
}

/// Outcome of decoding one frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    Packet(Packet),
    /// A chain fragment was stored; the message is not complete yet.
    ChainPending {
        sender: Address,
        sequence: u8,
        received: usize,
        declared_len: usize,
    },
    /// A continuation fragment arrived without its first fragment and was
    /// dropped.
    ChainOrphaned {
        sender: Address,
        sequence: u8,
        index: u8,
    },
}

impl Decoded {
    pub fn packet(&self) -> Option<&Packet> {
        match self {
            Decoded::Packet(packet) => Some(packet),
            _ => None,
        }
    }

    pub fn into_packet(self) -> Option<Packet> {
        match self {
            Decoded::Packet(packet) => Some(packet),
            _ => None,
        }
    }
}

/// Turns frames into packets: parses them, reassembles chains and decodes
/// payloads of senders bound to a profile.
///
/// Chain state lives in this decoder, so two decoders never share partial
/// messages.
pub struct PacketDecoder {
    catalog: Option<SharedCatalog>,
    chains: ChainStore,
    bindings: HashMap<Address, ProfileId>,
    config: DecoderConfig,
}

impl PacketDecoder {
    /// Decoder without a catalog: packets are parsed but fields are never
    /// decoded.
    pub fn new() -> Self {
        Self::with_config(None, DecoderConfig::default())
    }

    pub fn with_catalog(catalog: SharedCatalog) -> Self {
        Self::with_config(Some(catalog), DecoderConfig::default())
    }

    pub fn with_config(catalog: Option<SharedCatalog>, config: DecoderConfig) -> Self {
        Self {
            catalog,
            chains: ChainStore::with_config(config.chain),
            bindings: HashMap::new(),
            config,
        }
    }

    /// Decode telegrams from `sender` with `profile`.
    pub fn bind(&mut self, sender: Address, profile: ProfileId) {
        tracing::debug!(%sender, %profile, "sender bound");
        self.bindings.insert(sender, profile);
    }

    pub fn unbind(&mut self, sender: &Address) -> Option<ProfileId> {
        self.bindings.remove(sender)
    }

    pub fn binding(&self, sender: &Address) -> Option<ProfileId> {
        self.bindings.get(sender).copied()
    }

    /// Decode the next frame in `src`.
    ///
    /// Returns `Ok(None)` when `src` holds no complete frame. A checksum
    /// error drops the damaged frame from `src`; calling again continues with
    /// the bytes after it.
    pub fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Decoded>> {
        match decode_frame(src)? {
            Some(frame) => Ok(Some(self.decode_packet(&frame))),
            None => Ok(None),
        }
    }

    /// Decode a verified frame.
    pub fn decode_packet(&mut self, frame: &Frame) -> Decoded {
        let mut packet = Packet::parse(frame);

        if packet.is_chain_fragment() {
            if let Some(fragment) = ChainFragment::parse(&frame.data, &frame.optional) {
                return self.accept_fragment(packet, fragment);
            }
        }

        if self.config.learn_from_teach_in {
            self.learn(&packet);
        }
        self.apply_profile(&mut packet);
        Decoded::Packet(packet)
    }

    fn accept_fragment(&mut self, fragment_packet: Packet, fragment: ChainFragment) -> Decoded {
        let index = fragment.index;
        match self.chains.accept(fragment) {
            ChainProgress::Pending {
                sender,
                sequence,
                received,
                declared_len,
            } => Decoded::ChainPending {
                sender,
                sequence,
                received,
                declared_len,
            },
            ChainProgress::Orphaned {
                sender,
                sequence,
                index,
            } => Decoded::ChainOrphaned {
                sender,
                sequence,
                index,
            },
            ChainProgress::Complete(done) => {
                let frame = Frame::new(RADIO_ERP1, done.data.clone(), done.optional.clone());
                let mut packet = Packet::parse(&frame);
                let radio = packet.radio().or(fragment_packet.radio()).cloned();
                let Some(radio) = radio else {
                    return Decoded::Packet(packet);
                };
                packet.kind = PacketKind::Chained(ChainedInfo {
                    radio,
                    framing: done.framing,
                    sequence: done.sequence,
                    index,
                    declared_len: Some(done.declared_len),
                    fragments: done.fragments,
                    complete: true,
                });
                self.apply_profile(&mut packet);
                Decoded::Packet(packet)
            }
        }
    }

    fn learn(&mut self, packet: &Packet) {
        let announced = match &packet.kind {
            PacketKind::TeachIn(info) if info.request != TeachInRequest::Delete => {
                Some((info.radio.sender, info.eep))
            }
            PacketKind::Radio(info) => info.announced_profile().map(|id| (info.sender, id)),
            _ => None,
        };
        if let Some((sender, profile)) = announced {
            tracing::info!(%sender, %profile, "learned profile from teach-in");
            self.bindings.insert(sender, profile);
        }
    }

    fn apply_profile(&self, packet: &mut Packet) {
        let Some(catalog) = &self.catalog else {
            return;
        };
        let Some(radio) = packet.radio() else {
            return;
        };
        if matches!(packet.kind, PacketKind::TeachIn(_))
            || (rorg::has_learn_bit(packet.rorg) && radio.learn)
        {
            return;
        }
        let Some(profile) = self.bindings.get(&radio.sender).copied() else {
            return;
        };
        if profile.rorg != packet.catalog_rorg() {
            tracing::debug!(
                sender = %radio.sender,
                %profile,
                rorg = packet.catalog_rorg(),
                "bound profile does not match telegram category"
            );
            return;
        }
        if let Err(err) = packet.parse_eep(catalog.as_ref(), profile.func, profile.type_, None, None)
        {
            tracing::debug!(%profile, error = %err, "payload not decoded");
        }
    }

    pub fn chains(&self) -> &ChainStore {
        &self.chains
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }
}

impl Default for PacketDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PacketDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PacketDecoder")
            .field("has_catalog", &self.catalog.is_some())
            .field("pending_chains", &self.chains.len())
            .field("bindings", &self.bindings.len())
            .field("config", &self.config)
            .finish()
    }
}
