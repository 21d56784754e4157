use crate::observable::{ObservableProfileList, ProfileEntry};
use midi_ci_codec::header::CommonHeader;
use midi_ci_codec::message::CiMessage;
use midi_ci_types::status::sub_id2;
use midi_ci_types::{Address, Muid, ProfileId};

/// Server side of the profile protocol: this device advertises and toggles
/// its own profiles (spec §4.3, `ProfileHostFacade`).
pub struct ProfileHostFacade {
    pub list: ObservableProfileList,
    local_muid: Muid,
}

impl ProfileHostFacade {
    pub fn new(local_muid: Muid) -> Self {
        ProfileHostFacade { list: ObservableProfileList::new(), local_muid }
    }

    fn broadcast_header(&self, sub_id2: u8) -> CommonHeader {
        CommonHeader::new(Address::FunctionBlock, sub_id2, self.local_muid, Muid::BROADCAST)
    }

    /// Inserts a profile with `enabled=false` and returns the report to
    /// broadcast (spec §4.3).
    pub fn add_profile(&self, profile_id: ProfileId, group: u8, addr: Address) -> CiMessage {
        self.list.add(ProfileEntry { profile_id, group, addr, enabled: false, channels_requested: 0 });
        CiMessage::ProfileAddedReport { header: self.broadcast_header(sub_id2::PROFILE_ADDED_REPORT), profile: profile_id }
    }

    pub fn remove_profile(&self, profile_id: ProfileId, group: u8, addr: Address) -> CiMessage {
        self.list.remove(profile_id, group, addr);
        CiMessage::ProfileRemovedReport {
            header: self.broadcast_header(sub_id2::PROFILE_REMOVED_REPORT),
            profile: profile_id,
        }
    }

    pub fn enable_profile(&self, group: u8, addr: Address, profile_id: ProfileId, channels: u16) -> CiMessage {
        self.list.set_enabled(profile_id, group, addr, true, channels);
        CiMessage::ProfileEnabledReport {
            header: self.broadcast_header(sub_id2::PROFILE_ENABLED_REPORT),
            profile: profile_id,
            channels,
        }
    }

    pub fn disable_profile(&self, group: u8, addr: Address, profile_id: ProfileId, channels: u16) -> CiMessage {
        self.list.set_enabled(profile_id, group, addr, false, channels);
        CiMessage::ProfileDisabledReport {
            header: self.broadcast_header(sub_id2::PROFILE_DISABLED_REPORT),
            profile: profile_id,
            channels,
        }
    }

    /// Builds the reply to an inbound `ProfileInquiry` addressed to `reply_to`.
    pub fn handle_inquiry(&self, reply_to: Muid) -> CiMessage {
        CiMessage::ProfileInquiryReply {
            header: CommonHeader::new(Address::FunctionBlock, sub_id2::PROFILE_INQUIRY_REPLY, self.local_muid, reply_to),
            enabled: self.list.enabled().into_iter().map(|e| e.profile_id).collect(),
            disabled: self.list.disabled().into_iter().map(|e| e.profile_id).collect(),
        }
    }

    /// Applies an inbound `ProfileSetOn`/`ProfileSetOff` and returns the
    /// Enabled/Disabled report to send back.
    pub fn handle_set(&self, msg: &CiMessage) -> Option<CiMessage> {
        match msg {
            CiMessage::ProfileSetOn { header, profile, channels } => {
                Some(self.enable_profile(0, header.addr, *profile, *channels))
            }
            CiMessage::ProfileSetOff { header, profile, channels } => {
                Some(self.disable_profile(0, header.addr, *profile, *channels))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_then_enable_reports_correctly() {
        let host = ProfileHostFacade::new(Muid(1));
        let pid = ProfileId([1, 2, 3, 4, 5]);
        let added = host.add_profile(pid, 0, Address::Channel(0));
        assert!(matches!(added, CiMessage::ProfileAddedReport { .. }));
        let enabled = host.enable_profile(0, Address::Channel(0), pid, 3);
        match enabled {
            CiMessage::ProfileEnabledReport { profile, channels, .. } => {
                assert_eq!(profile, pid);
                assert_eq!(channels, 3);
            }
            _ => panic!("wrong variant"),
        }
        assert_eq!(host.list.enabled().len(), 1);
    }

    #[test]
    fn inquiry_reply_splits_enabled_and_disabled() {
        let host = ProfileHostFacade::new(Muid(1));
        let a = ProfileId([1, 0, 0, 0, 0]);
        let b = ProfileId([2, 0, 0, 0, 0]);
        host.add_profile(a, 0, Address::Channel(0));
        host.add_profile(b, 0, Address::Channel(0));
        host.enable_profile(0, Address::Channel(0), a, 1);
        match host.handle_inquiry(Muid(2)) {
            CiMessage::ProfileInquiryReply { enabled, disabled, .. } => {
                assert_eq!(enabled, vec![a]);
                assert_eq!(disabled, vec![b]);
            }
            _ => panic!("wrong variant"),
        }
    }
}
