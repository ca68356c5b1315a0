use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use std::{fmt, io};

use log::debug;
use url::Url;

use super::common::*;
use super::fields::*;
use super::media::*;
use super::state::State;
use crate::error::{Error, Result};
use crate::lexer::*;
use crate::util::*;

/// Constants for SDP attributes used in JSEP
pub const ATTR_KEY_IDENTITY: &str = "identity";
pub const ATTR_KEY_CONNECTION_SETUP: &str = "setup";
pub const ATTR_KEY_RTPMAP: &str = "rtpmap";
pub const ATTR_KEY_FMTP: &str = "fmtp";
pub const ATTR_KEY_RTCPFB: &str = "rtcp-fb";

/// Version describes the value provided by the "v=" field which gives
/// the version of the Session Description Protocol.
pub type Version = isize;

/// Origin defines the structure for the "o=" field which provides the
/// originator of the session plus a session identifier and version number.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Origin {
    pub username: String,
    pub session_id: u64,
    pub session_version: u64,
    pub network_type: String,
    pub address_type: String,
    pub unicast_address: String,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {} {}",
            self.username,
            self.session_id,
            self.session_version,
            self.network_type,
            self.address_type,
            self.unicast_address,
        )
    }
}

/// SessionName describes a structured representations for the "s=" field
/// and is the textual session name.
pub type SessionName = String;

/// EmailAddress describes a structured representations for the "e=" line
/// which specifies email contact information for the person responsible for
/// the conference.
pub type EmailAddress = String;

/// PhoneNumber describes a structured representations for the "p=" line
/// specify phone contact information for the person responsible for the
/// conference.
pub type PhoneNumber = String;

/// TimeZone defines the structured object for "z=" line which describes
/// repeated sessions scheduling.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TimeZone {
    pub adjustment_time: u64,
    pub offset: i64,
}

impl fmt::Display for TimeZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.adjustment_time, self.offset)
    }
}

/// TimeDescription describes "t=", "r=" fields of the session description
/// which are used to specify the start and stop times for a session as well as
/// repeat intervals and durations for the scheduled session.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TimeDescription {
    /// `t=<start-time> <stop-time>`
    ///
    /// <https://tools.ietf.org/html/rfc4566#section-5.9>
    pub timing: Timing,

    /// `r=<repeat interval> <active duration> <offsets from start-time>`
    ///
    /// <https://tools.ietf.org/html/rfc4566#section-5.10>
    pub repeat_times: Vec<RepeatTime>,
}

/// Timing defines the "t=" field's structured representation for the start and
/// stop times.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Timing {
    pub start_time: u64,
    pub stop_time: u64,
}

impl fmt::Display for Timing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.start_time, self.stop_time)
    }
}

/// RepeatTime describes the "r=" fields of the session description which
/// represents the intervals and durations for repeated scheduled sessions.
/// All values are in seconds; shorthand units are resolved while parsing.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RepeatTime {
    pub interval: i64,
    pub duration: i64,
    pub offsets: Vec<i64>,
}

impl fmt::Display for RepeatTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.interval, self.duration)?;

        for value in &self.offsets {
            write!(f, " {value}")?;
        }
        Ok(())
    }
}

/// SessionDescription is a a well-defined format for conveying sufficient
/// information to discover and participate in a multimedia session.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SessionDescription {
    /// `v=0`
    ///
    /// <https://tools.ietf.org/html/rfc4566#section-5.1>
    pub version: Version,

    /// `o=<username> <sess-id> <sess-version> <nettype> <addrtype> <unicast-address>`
    ///
    /// <https://tools.ietf.org/html/rfc4566#section-5.2>
    pub origin: Origin,

    /// `s=<session name>`
    ///
    /// <https://tools.ietf.org/html/rfc4566#section-5.3>
    pub session_name: SessionName,

    /// `i=<session description>`
    ///
    /// <https://tools.ietf.org/html/rfc4566#section-5.4>
    pub session_information: Option<Information>,

    /// `u=<uri>`
    ///
    /// <https://tools.ietf.org/html/rfc4566#section-5.5>
    pub uri: Option<String>,

    /// `e=<email-address>`
    ///
    /// <https://tools.ietf.org/html/rfc4566#section-5.6>
    pub email_address: Option<EmailAddress>,

    /// `p=<phone-number>`
    ///
    /// <https://tools.ietf.org/html/rfc4566#section-5.6>
    pub phone_number: Option<PhoneNumber>,

    /// `c=<nettype> <addrtype> <connection-address>`
    ///
    /// <https://tools.ietf.org/html/rfc4566#section-5.7>
    pub connection_information: Option<ConnectionInformation>,

    /// `b=<bwtype>:<bandwidth>`
    ///
    /// <https://tools.ietf.org/html/rfc4566#section-5.8>
    pub bandwidth: Vec<Bandwidth>,

    /// <https://tools.ietf.org/html/rfc4566#section-5.9>
    /// <https://tools.ietf.org/html/rfc4566#section-5.10>
    pub time_descriptions: Vec<TimeDescription>,

    /// `z=<adjustment time> <offset> <adjustment time> <offset> ...`
    ///
    /// <https://tools.ietf.org/html/rfc4566#section-5.11>
    pub time_zones: Vec<TimeZone>,

    /// `k=<method>`
    ///
    /// `k=<method>:<encryption key>`
    ///
    /// <https://tools.ietf.org/html/rfc4566#section-5.12>
    pub encryption_key: Option<EncryptionKey>,

    /// `a=<attribute>`
    ///
    /// `a=<attribute>:<value>`
    ///
    /// <https://tools.ietf.org/html/rfc4566#section-5.13>
    pub attributes: Vec<Attribute>,

    /// <https://tools.ietf.org/html/rfc4566#section-5.14>
    pub media_descriptions: Vec<MediaDescription>,
}

impl fmt::Display for SessionDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_key_value(f, "v=", Some(&self.version))?;
        write_key_value(f, "o=", Some(&self.origin))?;
        write_key_value(f, "s=", Some(&self.session_name))?;

        write_key_value(f, "i=", self.session_information.as_ref())?;
        write_key_value(f, "u=", self.uri.as_ref())?;
        write_key_value(f, "e=", self.email_address.as_ref())?;
        write_key_value(f, "p=", self.phone_number.as_ref())?;
        write_key_value(f, "c=", self.connection_information.as_ref())?;

        for bandwidth in &self.bandwidth {
            write_key_value(f, "b=", Some(bandwidth))?;
        }
        for time_description in &self.time_descriptions {
            write_key_value(f, "t=", Some(&time_description.timing))?;
            for repeat_time in &time_description.repeat_times {
                write_key_value(f, "r=", Some(repeat_time))?;
            }
        }

        write_key_slice_of_values(f, "z=", &self.time_zones)?;

        write_key_value(f, "k=", self.encryption_key.as_ref())?;
        for attribute in &self.attributes {
            write_key_value(f, "a=", Some(attribute))?;
        }

        for media_description in &self.media_descriptions {
            write_key_value(f, "m=", Some(&media_description.media_name))?;
            write_key_value(f, "i=", media_description.media_title.as_ref())?;
            write_key_value(
                f,
                "c=",
                media_description.connection_information.as_ref(),
            )?;
            for bandwidth in &media_description.bandwidth {
                write_key_value(f, "b=", Some(bandwidth))?;
            }
            write_key_value(f, "k=", media_description.encryption_key.as_ref())?;
            for attribute in &media_description.attributes {
                write_key_value(f, "a=", Some(attribute))?;
            }
        }

        Ok(())
    }
}

impl SessionDescription {
    /// API to match draft-ietf-rtcweb-jsep
    ///
    /// new_jsep_session_description creates a new SessionDescription with
    /// some settings that are required by JSEP.
    pub fn new_jsep_session_description(identity: bool) -> Result<Self> {
        let d = SessionDescription {
            version: 0,
            origin: Origin {
                username: "-".to_string(),
                session_id: new_session_id()?,
                session_version: SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .unwrap_or_else(|_| Duration::from_secs(0))
                    .subsec_nanos() as u64,
                network_type: "IN".to_string(),
                address_type: "IP4".to_string(),
                unicast_address: "0.0.0.0".to_string(),
            },
            session_name: "-".to_string(),
            time_descriptions: vec![TimeDescription {
                timing: Timing {
                    start_time: 0,
                    stop_time: 0,
                },
                repeat_times: vec![],
            }],
            ..Default::default()
        };

        Ok(if identity {
            d.with_property_attribute(ATTR_KEY_IDENTITY.to_string())
        } else {
            d
        })
    }

    /// with_property_attribute adds a property attribute 'a=key' to the session description
    pub fn with_property_attribute(mut self, key: String) -> Self {
        self.attributes.push(Attribute::new(key, None));
        self
    }

    /// with_value_attribute adds a value attribute 'a=key:value' to the session description
    pub fn with_value_attribute(mut self, key: String, value: String) -> Self {
        self.attributes.push(Attribute::new(key, Some(value)));
        self
    }

    /// with_fingerprint adds a fingerprint to the session description
    pub fn with_fingerprint(self, algorithm: String, value: String) -> Self {
        self.with_value_attribute("fingerprint".to_string(), algorithm + " " + value.as_str())
    }

    /// with_media adds a media description to the session description
    pub fn with_media(mut self, md: MediaDescription) -> Self {
        self.media_descriptions.push(md);
        self
    }

    /// get_codec_for_payload_type scans the SessionDescription for the given payload type and returns the codec
    pub fn get_codec_for_payload_type(&self, payload_type: u8) -> Result<Codec> {
        build_codec_map(&self.media_descriptions)
            .remove(&payload_type)
            .ok_or(Error::PayloadTypeNotFound)
    }

    /// get_codecs_for_payload_types returns the codecs of every listed payload
    /// type that is described, skipping the ones that are not.
    pub fn get_codecs_for_payload_types(&self, payload_types: &[u8]) -> Vec<Codec> {
        let codecs = build_codec_map(&self.media_descriptions);

        payload_types
            .iter()
            .filter_map(|payload_type| codecs.get(payload_type).cloned())
            .collect()
    }

    /// get_payload_type_for_codec scans the SessionDescription for a codec that matches the provided codec
    /// as closely as possible and returns its payload type. Candidates are
    /// tried in ascending payload type order.
    pub fn get_payload_type_for_codec(&self, wanted: &Codec) -> Result<u8> {
        build_codec_map(&self.media_descriptions)
            .into_iter()
            .find(|(_, codec)| codecs_match(wanted, codec))
            .map(|(payload_type, _)| payload_type)
            .ok_or(Error::CodecNotFound)
    }

    /// Returns whether an attribute exists
    pub fn has_attribute(&self, key: &str) -> bool {
        self.attributes.iter().any(|a| a.key == key)
    }

    /// Attribute returns the value of an attribute and if it exists
    pub fn attribute(&self, key: &str) -> Option<&String> {
        self.attributes
            .iter()
            .find(|a| a.key == key)
            .and_then(|a| a.value.as_ref())
    }

    /// parsed_uri resolves the `u=` text as an absolute URL. The field itself
    /// keeps the text exactly as it was received.
    pub fn parsed_uri(&self) -> Option<Result<Url>> {
        self.uri
            .as_deref()
            .map(|uri| Url::parse(uri).map_err(Error::from))
    }

    /// Marshal takes a SDP struct to text
    ///
    /// <https://tools.ietf.org/html/rfc4566#section-5>
    ///
    /// Session description
    ///    v=  (protocol version)
    ///    o=  (originator and session identifier)
    ///    s=  (session name)
    ///    i=* (session information)
    ///    u=* (URI of description)
    ///    e=* (email address)
    ///    p=* (phone number)
    ///    c=* (connection information -- not required if included in
    ///         all media)
    ///    b=* (zero or more bandwidth information lines)
    ///    One or more time descriptions ("t=" and "r=" lines; see below)
    ///    z=* (time zone adjustments)
    ///    k=* (encryption key)
    ///    a=* (zero or more session attribute lines)
    ///    Zero or more media descriptions
    ///
    /// Time description
    ///    t=  (time the session is active)
    ///    r=* (zero or more repeat times)
    ///
    /// Media description, if present
    ///    m=  (media name and transport address)
    ///    i=* (media title)
    ///    c=* (connection information -- optional if included at
    ///         session level)
    ///    b=* (zero or more bandwidth information lines)
    ///    k=* (encryption key)
    ///    a=* (zero or more media attribute lines)
    ///
    /// Lines are always terminated with CRLF and durations are written in
    /// seconds, whatever the input looked like.
    pub fn marshal(&self) -> String {
        self.to_string()
    }

    /// Unmarshal is the primary function that deserializes the session description
    /// message and stores it inside of a structured SessionDescription object.
    ///
    /// Records are fed through the [`State`] automaton; the first record the
    /// grammar does not allow, or the first field that fails to decode, aborts
    /// the whole parse.
    pub fn unmarshal<R: io::BufRead>(reader: &mut R) -> Result<Self> {
        let mut desc = SessionDescription::default();
        let mut state = State::Start;

        let mut lexer = Lexer::new(reader);
        while let Some(record) = lexer.read_record()? {
            state = match state.next(record.key) {
                Some(next) => next,
                None => {
                    debug!("sdp: unexpected `{}` after {:?}", record.line, state);
                    return Err(record.syntax_error());
                }
            };

            desc.unmarshal_field(state, record.value())?;
        }

        if !state.is_terminal() {
            debug!("sdp: description ended after {state:?}");
            return Err(Error::SdpInvalidSyntax(
                "unexpected end of description".to_owned(),
            ));
        }

        Ok(desc)
    }

    fn unmarshal_field(&mut self, state: State, value: &str) -> Result<()> {
        match state {
            State::Start => {}
            State::Version => self.version = unmarshal_protocol_version(value)?,
            State::Origin => self.origin = unmarshal_origin(value)?,
            State::SessionName => self.session_name = value.to_owned(),
            State::SessionInformation => self.session_information = Some(value.to_owned()),
            State::Uri => self.uri = Some(value.to_owned()),
            State::EmailAddress => self.email_address = Some(value.to_owned()),
            State::PhoneNumber => self.phone_number = Some(value.to_owned()),
            State::SessionConnectionInformation => {
                self.connection_information = Some(unmarshal_connection_information(value)?)
            }
            State::SessionBandwidth => self.bandwidth.push(unmarshal_bandwidth(value)?),
            State::Timing => self.time_descriptions.push(TimeDescription {
                timing: unmarshal_timing(value)?,
                repeat_times: vec![],
            }),
            State::RepeatTimes => {
                let repeat_time = unmarshal_repeat_time(value)?;
                let Some(latest_time_desc) = self.time_descriptions.last_mut() else {
                    return Err(Error::SdpInvalidSyntax(format!("`r={value}`")));
                };
                latest_time_desc.repeat_times.push(repeat_time);
            }
            State::TimeZones => self.time_zones = unmarshal_time_zones(value)?,
            State::SessionEncryptionKey => self.encryption_key = Some(value.to_owned()),
            State::SessionAttribute => self.attributes.push(unmarshal_attribute(value)),
            State::MediaName => self.media_descriptions.push(MediaDescription {
                media_name: unmarshal_media_name(value)?,
                ..Default::default()
            }),
            State::MediaTitle => {
                self.latest_media_description()?.media_title = Some(value.to_owned())
            }
            State::MediaConnectionInformation => {
                let connection_information = unmarshal_connection_information(value)?;
                self.latest_media_description()?.connection_information =
                    Some(connection_information);
            }
            State::MediaBandwidth => {
                let bandwidth = unmarshal_bandwidth(value)?;
                self.latest_media_description()?.bandwidth.push(bandwidth);
            }
            State::MediaEncryptionKey => {
                self.latest_media_description()?.encryption_key = Some(value.to_owned())
            }
            State::MediaAttribute => {
                let attribute = unmarshal_attribute(value);
                self.latest_media_description()?.attributes.push(attribute);
            }
        }

        Ok(())
    }

    fn latest_media_description(&mut self) -> Result<&mut MediaDescription> {
        self.media_descriptions
            .last_mut()
            .ok_or_else(|| Error::SdpInvalidSyntax("media field before `m=`".to_owned()))
    }
}

impl From<SessionDescription> for String {
    fn from(sdp: SessionDescription) -> String {
        sdp.marshal()
    }
}

impl TryFrom<String> for SessionDescription {
    type Error = Error;
    fn try_from(sdp_string: String) -> Result<Self> {
        sdp_string.parse()
    }
}

impl TryFrom<&str> for SessionDescription {
    type Error = Error;
    fn try_from(sdp_string: &str) -> Result<Self> {
        sdp_string.parse()
    }
}

impl FromStr for SessionDescription {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        let mut reader = io::Cursor::new(s.as_bytes());
        SessionDescription::unmarshal(&mut reader)
    }
}
