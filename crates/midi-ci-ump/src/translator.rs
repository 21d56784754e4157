use midi_ci_types::error::CiError;

const CC_BANK_MSB: u8 = 0;
const CC_BANK_LSB: u8 = 32;
const CC_DATA_ENTRY_MSB: u8 = 6;
const CC_NRPN_LSB: u8 = 98;
const CC_NRPN_MSB: u8 = 99;
const CC_RPN_LSB: u8 = 100;
const CC_RPN_MSB: u8 = 101;
const CC_DATA_ENTRY_LSB: u8 = 38;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SelectedParam {
    Rpn,
    Nrpn,
}

/// Per-channel RPN/NRPN/DTE reassembly state (spec §4.8).
///
/// Wire order is Data Entry MSB first, Data Entry LSB second and optional,
/// mirroring Bank Select and RPN/NRPN's own MSB-then-LSB convention. MSB
/// alone completes the value (LSB defaults to 0); a following LSB refines
/// and re-emits it. `expect_lsb` gates the LSB guard below: it only becomes
/// true once this channel's MSB has actually arrived.
#[derive(Debug, Default, Clone, Copy)]
struct ChannelState {
    bank_msb: Option<u8>,
    bank_lsb: Option<u8>,
    rpn: (Option<u8>, Option<u8>),
    nrpn: (Option<u8>, Option<u8>),
    selected: Option<SelectedParam>,
    dte_msb: Option<u8>,
    dte_lsb: Option<u8>,
    expect_lsb: bool,
}

/// A MIDI 1.0 channel-voice message the translator understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Midi1ChannelMessage {
    NoteOff { channel: u8, note: u8, velocity: u8 },
    NoteOn { channel: u8, note: u8, velocity: u8 },
    PolyPressure { channel: u8, note: u8, pressure: u8 },
    ControlChange { channel: u8, controller: u8, value: u8 },
    ProgramChange { channel: u8, program: u8 },
    ChannelPressure { channel: u8, pressure: u8 },
    PitchBend { channel: u8, value: u16 },
}

impl Midi1ChannelMessage {
    pub fn channel(self) -> u8 {
        match self {
            Midi1ChannelMessage::NoteOff { channel, .. }
            | Midi1ChannelMessage::NoteOn { channel, .. }
            | Midi1ChannelMessage::PolyPressure { channel, .. }
            | Midi1ChannelMessage::ControlChange { channel, .. }
            | Midi1ChannelMessage::ProgramChange { channel, .. }
            | Midi1ChannelMessage::ChannelPressure { channel, .. }
            | Midi1ChannelMessage::PitchBend { channel, .. } => channel,
        }
    }

    /// Packs this message into one UMP word (message type 2, MIDI 1.0 Channel Voice).
    pub fn to_ump1_word(self, group: u8) -> u32 {
        let b0 = (0x2 << 4) | (group & 0x0F);
        let (status, ch, d1, d2) = match self {
            Midi1ChannelMessage::NoteOff { channel, note, velocity } => (0x8, channel, note, velocity),
            Midi1ChannelMessage::NoteOn { channel, note, velocity } => (0x9, channel, note, velocity),
            Midi1ChannelMessage::PolyPressure { channel, note, pressure } => (0xA, channel, note, pressure),
            Midi1ChannelMessage::ControlChange { channel, controller, value } => (0xB, channel, controller, value),
            Midi1ChannelMessage::ProgramChange { channel, program } => (0xC, channel, program, 0),
            Midi1ChannelMessage::ChannelPressure { channel, pressure } => (0xD, channel, pressure, 0),
            Midi1ChannelMessage::PitchBend { channel, value } => {
                (0xE, channel, (value & 0x7F) as u8, ((value >> 7) & 0x7F) as u8)
            }
        };
        let b1 = (status << 4) | (ch & 0x0F);
        u32::from_be_bytes([b0, b1, d1 & 0x7F, d2 & 0x7F])
    }

    pub fn from_ump1_word(word: u32) -> Result<Self, CiError> {
        let b = word.to_be_bytes();
        if b[0] >> 4 != 0x2 {
            return Err(CiError::InvalidStatus);
        }
        let status = b[1] >> 4;
        let channel = b[1] & 0x0F;
        let d1 = b[2] & 0x7F;
        let d2 = b[3] & 0x7F;
        Ok(match status {
            0x8 => Midi1ChannelMessage::NoteOff { channel, note: d1, velocity: d2 },
            0x9 => Midi1ChannelMessage::NoteOn { channel, note: d1, velocity: d2 },
            0xA => Midi1ChannelMessage::PolyPressure { channel, note: d1, pressure: d2 },
            0xB => Midi1ChannelMessage::ControlChange { channel, controller: d1, value: d2 },
            0xC => Midi1ChannelMessage::ProgramChange { channel, program: d1 },
            0xD => Midi1ChannelMessage::ChannelPressure { channel, pressure: d1 },
            0xE => Midi1ChannelMessage::PitchBend { channel, value: (d1 as u16) | ((d2 as u16) << 7) },
            _ => return Err(CiError::InvalidStatus),
        })
    }
}

/// A MIDI 2.0 UMP Registered/Assignable (RPN/NRPN) Per-Channel Controller
/// message (message type 4), as emitted on DTE completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ump2RpnMessage {
    pub group: u8,
    pub channel: u8,
    pub is_nrpn: bool,
    pub bank: u8,
    pub index: u8,
    pub data: u32,
}

impl Ump2RpnMessage {
    pub fn to_words(self) -> [u32; 2] {
        let status = if self.is_nrpn { 0x2 } else { 0x3 };
        let b0 = (0x4 << 4) | (self.group & 0x0F);
        let b1 = (status << 4) | (self.channel & 0x0F);
        let word0 = u32::from_be_bytes([b0, b1, self.bank, self.index]);
        [word0, self.data]
    }
}

/// Tracks RPN/NRPN/DTE/bank state across all 16 channels of one group, per
/// spec §4.8.
pub struct Translator {
    channels: [ChannelState; 16],
    pub allow_reordered_dte: bool,
}

impl Default for Translator {
    fn default() -> Self {
        Translator { channels: [ChannelState::default(); 16], allow_reordered_dte: false }
    }
}

impl Translator {
    pub fn new(allow_reordered_dte: bool) -> Self {
        Translator { channels: [ChannelState::default(); 16], allow_reordered_dte }
    }

    /// Feeds one MIDI1 channel-voice message. Returns `Some` when a
    /// data-entry sequence completes a bank-aware RPN/NRPN value, which the
    /// caller should emit as a UMP2 message instead of (or alongside) the
    /// plain UMP1 translation.
    pub fn process_midi1(
        &mut self,
        group: u8,
        msg: Midi1ChannelMessage,
    ) -> Result<Option<Ump2RpnMessage>, CiError> {
        let Midi1ChannelMessage::ControlChange { channel, controller, value } = msg else {
            return Ok(None);
        };
        let st = &mut self.channels[(channel & 0x0F) as usize];
        match controller {
            CC_BANK_MSB => st.bank_msb = Some(value),
            CC_BANK_LSB => st.bank_lsb = Some(value),
            CC_RPN_MSB => {
                st.rpn.0 = Some(value);
                st.selected = Some(SelectedParam::Rpn);
                st.dte_msb = None;
                st.dte_lsb = None;
                st.expect_lsb = false;
            }
            CC_RPN_LSB => {
                st.rpn.1 = Some(value);
                st.selected = Some(SelectedParam::Rpn);
                st.dte_msb = None;
                st.dte_lsb = None;
                st.expect_lsb = false;
            }
            CC_NRPN_MSB => {
                st.nrpn.0 = Some(value);
                st.selected = Some(SelectedParam::Nrpn);
                st.dte_msb = None;
                st.dte_lsb = None;
                st.expect_lsb = false;
            }
            CC_NRPN_LSB => {
                st.nrpn.1 = Some(value);
                st.selected = Some(SelectedParam::Nrpn);
                st.dte_msb = None;
                st.dte_lsb = None;
                st.expect_lsb = false;
            }
            CC_DATA_ENTRY_LSB => {
                if !self.allow_reordered_dte && !st.expect_lsb {
                    return Err(CiError::InvalidDteSequence);
                }
                st.dte_lsb = Some(value);
                let Some(selected) = st.selected else { return Ok(None) };
                let Some(msb) = st.dte_msb else { return Ok(None) };
                let (bank, index) = match selected {
                    SelectedParam::Rpn => (st.rpn.0.unwrap_or(0), st.rpn.1.unwrap_or(0)),
                    SelectedParam::Nrpn => (st.nrpn.0.unwrap_or(0), st.nrpn.1.unwrap_or(0)),
                };
                let data = ((msb as u32) << 25) | ((value as u32) << 18);
                return Ok(Some(Ump2RpnMessage {
                    group,
                    channel,
                    is_nrpn: matches!(selected, SelectedParam::Nrpn),
                    bank,
                    index,
                    data,
                }));
            }
            CC_DATA_ENTRY_MSB => {
                let Some(selected) = st.selected else { return Ok(None) };
                let (bank, index) = match selected {
                    SelectedParam::Rpn => (st.rpn.0.unwrap_or(0), st.rpn.1.unwrap_or(0)),
                    SelectedParam::Nrpn => (st.nrpn.0.unwrap_or(0), st.nrpn.1.unwrap_or(0)),
                };
                st.dte_msb = Some(value);
                st.expect_lsb = true;
                let lsb = st.dte_lsb.unwrap_or(0) as u32;
                let data = ((value as u32) << 25) | (lsb << 18);
                return Ok(Some(Ump2RpnMessage {
                    group,
                    channel,
                    is_nrpn: matches!(selected, SelectedParam::Nrpn),
                    bank,
                    index,
                    data,
                }));
            }
            _ => {}
        }
        Ok(None)
    }

    /// Inverse direction: downscale a UMP2 channel-voice word pair into a
    /// MIDI1 message, losing precision (e.g. 16-bit velocity -> 7-bit).
    pub fn ump2_note_to_midi1(on: bool, channel: u8, note: u8, velocity16: u16) -> Midi1ChannelMessage {
        let velocity7 = (velocity16 >> 9) as u8;
        if on {
            Midi1ChannelMessage::NoteOn { channel, note, velocity: velocity7 }
        } else {
            Midi1ChannelMessage::NoteOff { channel, note, velocity: velocity7 }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ump1_channel_voice_round_trips() {
        let msg = Midi1ChannelMessage::NoteOn { channel: 3, note: 60, velocity: 100 };
        let word = msg.to_ump1_word(0);
        assert_eq!(Midi1ChannelMessage::from_ump1_word(word).unwrap(), msg);
    }

    #[test]
    fn rpn_dte_sequence_emits_ump2() {
        let mut t = Translator::new(false);
        let cc = |controller, value| Midi1ChannelMessage::ControlChange { channel: 0, controller, value };
        assert!(t.process_midi1(0, cc(CC_RPN_MSB, 0)).unwrap().is_none());
        assert!(t.process_midi1(0, cc(CC_RPN_LSB, 1)).unwrap().is_none());

        let coarse = t.process_midi1(0, cc(CC_DATA_ENTRY_MSB, 0x40)).unwrap().unwrap();
        assert!(!coarse.is_nrpn);
        assert_eq!(coarse.bank, 0);
        assert_eq!(coarse.index, 1);
        assert_eq!(coarse.data, 0x40u32 << 25);

        let refined = t.process_midi1(0, cc(CC_DATA_ENTRY_LSB, 0x10)).unwrap().unwrap();
        assert_eq!(refined.data, (0x40u32 << 25) | (0x10u32 << 18));
    }

    #[test]
    fn out_of_order_dte_lsb_without_msb_rejected() {
        let mut t = Translator::new(false);
        let cc = |controller, value| Midi1ChannelMessage::ControlChange { channel: 0, controller, value };
        t.process_midi1(0, cc(CC_NRPN_MSB, 5)).unwrap();
        t.process_midi1(0, cc(CC_NRPN_LSB, 2)).unwrap();
        let err = t.process_midi1(0, cc(CC_DATA_ENTRY_LSB, 0x20));
        assert_eq!(err, Err(CiError::InvalidDteSequence));
    }

    #[test]
    fn allow_reordered_dte_permits_lsb_first() {
        let mut t = Translator::new(true);
        let cc = |controller, value| Midi1ChannelMessage::ControlChange { channel: 0, controller, value };
        t.process_midi1(0, cc(CC_NRPN_MSB, 5)).unwrap();
        t.process_midi1(0, cc(CC_NRPN_LSB, 2)).unwrap();
        assert!(t.process_midi1(0, cc(CC_DATA_ENTRY_LSB, 0x20)).unwrap().is_none());
        let msg = t.process_midi1(0, cc(CC_DATA_ENTRY_MSB, 0x7F)).unwrap().unwrap();
        assert!(msg.is_nrpn);
        assert_eq!(msg.bank, 5);
        assert_eq!(msg.index, 2);
    }
}
