use crate::observable::{ObservableProfileList, ProfileEntry};
use midi_ci_codec::header::CommonHeader;
use midi_ci_codec::message::CiMessage;
use midi_ci_types::status::sub_id2;
use midi_ci_types::{Address, Muid, ProfileId};

/// Client side of the profile protocol: mirrors a remote device's profile
/// list by observing its report messages (spec §4.3, `ProfileClientFacade`).
pub struct ProfileClientFacade {
    pub observed: ObservableProfileList,
    local_muid: Muid,
    remote_muid: Muid,
}

impl ProfileClientFacade {
    pub fn new(local_muid: Muid, remote_muid: Muid) -> Self {
        ProfileClientFacade { observed: ObservableProfileList::new(), local_muid, remote_muid }
    }

    /// Processes an inbound report/reply from the remote, updating the
    /// observed mirror. Returns nothing to send; reports are notifications.
    pub fn apply_inbound(&self, msg: &CiMessage) {
        match msg {
            CiMessage::ProfileAddedReport { profile, header } => {
                self.observed.add(ProfileEntry {
                    profile_id: *profile,
                    group: 0,
                    addr: header.addr,
                    enabled: false,
                    channels_requested: 0,
                });
            }
            CiMessage::ProfileRemovedReport { profile, header } => {
                self.observed.remove(*profile, 0, header.addr);
            }
            CiMessage::ProfileEnabledReport { profile, channels, header } => {
                if self.observed.set_enabled(*profile, 0, header.addr, true, *channels).is_none() {
                    self.observed.add(ProfileEntry {
                        profile_id: *profile,
                        group: 0,
                        addr: header.addr,
                        enabled: true,
                        channels_requested: *channels,
                    });
                }
            }
            CiMessage::ProfileDisabledReport { profile, channels, header } => {
                self.observed.set_enabled(*profile, 0, header.addr, false, *channels);
            }
            CiMessage::ProfileInquiryReply { enabled, disabled, header } => {
                for p in enabled {
                    self.observed.add(ProfileEntry {
                        profile_id: *p,
                        group: 0,
                        addr: header.addr,
                        enabled: true,
                        channels_requested: 0,
                    });
                }
                for p in disabled {
                    self.observed.add(ProfileEntry {
                        profile_id: *p,
                        group: 0,
                        addr: header.addr,
                        enabled: false,
                        channels_requested: 0,
                    });
                }
            }
            _ => {}
        }
    }

    /// Sends a `ProfileSetOn`/`ProfileSetOff` request.
    pub fn set_profile(&self, addr: Address, profile_id: ProfileId, enabled: bool, channels: u16) -> CiMessage {
        let sub_id2 = if enabled { sub_id2::PROFILE_SET_ON } else { sub_id2::PROFILE_SET_OFF };
        let header = CommonHeader::new(addr, sub_id2, self.local_muid, self.remote_muid);
        if enabled {
            CiMessage::ProfileSetOn { header, profile: profile_id, channels }
        } else {
            CiMessage::ProfileSetOff { header, profile: profile_id, channels }
        }
    }

    /// Sends a `ProfileDetailsInquiry`; the matching reply is correlated and
    /// returned to the caller by the messenger (C2), not this facade.
    pub fn request_profile_details(&self, addr: Address, profile_id: ProfileId, target: u8) -> CiMessage {
        CiMessage::ProfileDetailsInquiry {
            header: CommonHeader::new(addr, sub_id2::PROFILE_DETAILS_INQUIRY, self.local_muid, self.remote_muid),
            profile: profile_id,
            target,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mirrors_added_and_enabled_reports() {
        let client = ProfileClientFacade::new(Muid(1), Muid(2));
        let pid = ProfileId([9, 9, 9, 9, 9]);
        let header = CommonHeader::new(Address::Channel(0), sub_id2::PROFILE_ADDED_REPORT, Muid(2), Muid(1));
        client.apply_inbound(&CiMessage::ProfileAddedReport { header, profile: pid });
        assert_eq!(client.observed.snapshot().len(), 1);
        assert!(!client.observed.snapshot()[0].enabled);

        let header2 = CommonHeader::new(Address::Channel(0), sub_id2::PROFILE_ENABLED_REPORT, Muid(2), Muid(1));
        client.apply_inbound(&CiMessage::ProfileEnabledReport { header: header2, profile: pid, channels: 2 });
        assert!(client.observed.snapshot()[0].enabled);
    }
}
