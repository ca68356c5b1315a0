#[cfg(test)]
mod util_test;

use std::collections::BTreeMap;
use std::fmt;

use log::trace;
use rand::rngs::OsRng;
use rand::RngCore;

use super::description::common::Attribute;
use super::description::media::MediaDescription;
use super::description::session::{ATTR_KEY_FMTP, ATTR_KEY_RTCPFB, ATTR_KEY_RTPMAP};
use super::error::{Error, Result};

/// ConnectionRole indicates which of the end points should initiate the connection establishment
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub enum ConnectionRole {
    #[default]
    Unspecified,

    /// ConnectionRoleActive indicates the endpoint will initiate an outgoing connection.
    Active,

    /// ConnectionRolePassive indicates the endpoint will accept an incoming connection.
    Passive,

    /// ConnectionRoleActpass indicates the endpoint is willing to accept an incoming connection or to initiate an outgoing connection.
    Actpass,

    /// ConnectionRoleHoldconn indicates the endpoint does not want the connection to be established for the time being.
    Holdconn,
}

const CONNECTION_ROLE_ACTIVE_STR: &str = "active";
const CONNECTION_ROLE_PASSIVE_STR: &str = "passive";
const CONNECTION_ROLE_ACTPASS_STR: &str = "actpass";
const CONNECTION_ROLE_HOLDCONN_STR: &str = "holdconn";

impl fmt::Display for ConnectionRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionRole::Active => CONNECTION_ROLE_ACTIVE_STR,
            ConnectionRole::Passive => CONNECTION_ROLE_PASSIVE_STR,
            ConnectionRole::Actpass => CONNECTION_ROLE_ACTPASS_STR,
            ConnectionRole::Holdconn => CONNECTION_ROLE_HOLDCONN_STR,
            ConnectionRole::Unspecified => "Unspecified",
        };
        write!(f, "{s}")
    }
}

impl From<&str> for ConnectionRole {
    fn from(raw: &str) -> Self {
        match raw {
            CONNECTION_ROLE_ACTIVE_STR => ConnectionRole::Active,
            CONNECTION_ROLE_PASSIVE_STR => ConnectionRole::Passive,
            CONNECTION_ROLE_ACTPASS_STR => ConnectionRole::Actpass,
            CONNECTION_ROLE_HOLDCONN_STR => ConnectionRole::Holdconn,
            _ => ConnectionRole::Unspecified,
        }
    }
}

/// https://tools.ietf.org/html/draft-ietf-rtcweb-jsep-26#section-5.2.1
/// Session ID is recommended to be constructed by generating a 64-bit
/// quantity with the highest bit set to zero and the remaining 63-bits
/// being cryptographically random.
pub fn new_session_id() -> Result<u64> {
    new_session_id_with(&mut OsRng)
}

/// new_session_id_with draws the session ID from the given random source,
/// propagating its failure when no entropy is available.
pub fn new_session_id_with<R: RngCore + ?Sized>(rng: &mut R) -> Result<u64> {
    let mut buf = [0u8; 8];
    rng.try_fill_bytes(&mut buf)?;
    Ok(u64::from_be_bytes(buf) & !(1u64 << 63))
}

// Codec represents a codec
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Codec {
    pub payload_type: u8,
    pub name: String,
    pub clock_rate: u32,
    pub encoding_parameters: String,
    pub fmtp: String,
    pub rtcp_feedback: Vec<String>,
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}/{}/{} ({}) [{}]",
            self.payload_type,
            self.name,
            self.clock_rate,
            self.encoding_parameters,
            self.fmtp,
            self.rtcp_feedback.join(", "),
        )
    }
}

impl Codec {
    /// append_rtcp_feedback adds a feedback type unless the exact same string
    /// is already listed.
    fn append_rtcp_feedback(&mut self, rtcp_feedback: &str) {
        if !self.rtcp_feedback.iter().any(|fb| fb == rtcp_feedback) {
            self.rtcp_feedback.push(rtcp_feedback.to_owned());
        }
    }
}

/// CodecFragment is what a single codec attribute line contributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum CodecFragment {
    Codec(Codec),
    /// `a=rtcp-fb:* ...`, applies to every codec
    WildcardFeedback(String),
}

fn parse_payload_type(key: &str) -> Result<&str> {
    let pt_split: Vec<&str> = key.split(':').collect();
    if pt_split.len() != 2 {
        return Err(Error::MissingColon);
    }
    Ok(pt_split[1])
}

pub(crate) fn parse_rtpmap(rtpmap: &str) -> Result<Codec> {
    // a=rtpmap:<payload type> <encoding name>/<clock rate>[/<encoding parameters>]
    let split: Vec<&str> = rtpmap.split(' ').collect();
    if split.len() != 2 {
        return Err(Error::MissingWhitespace);
    }

    let payload_type = parse_payload_type(split[0])?.parse::<u8>()?;

    let split: Vec<&str> = split[1].split('/').collect();
    let name = split[0].to_string();
    let parts = split.len();
    let clock_rate = if parts > 1 {
        split[1].parse::<u32>()?
    } else {
        0
    };
    let encoding_parameters = if parts > 2 {
        split[2].to_string()
    } else {
        "".to_string()
    };

    Ok(Codec {
        payload_type,
        name,
        clock_rate,
        encoding_parameters,
        ..Default::default()
    })
}

pub(crate) fn parse_fmtp(fmtp: &str) -> Result<Codec> {
    // a=fmtp:<format> <format specific parameters>
    let Some((format, fmtp)) = fmtp.split_once(' ') else {
        return Err(Error::MissingWhitespace);
    };

    let payload_type = parse_payload_type(format)?.parse::<u8>()?;

    Ok(Codec {
        payload_type,
        fmtp: fmtp.to_string(),
        ..Default::default()
    })
}

pub(crate) fn parse_rtcp_fb(rtcp_fb: &str) -> Result<CodecFragment> {
    // a=rtcp-fb:<payload type> <RTCP feedback type> [<RTCP feedback parameter>]
    let Some((format, feedback)) = rtcp_fb.split_once(' ') else {
        return Err(Error::MissingWhitespace);
    };

    let payload_type = parse_payload_type(format)?;
    if payload_type == "*" {
        return Ok(CodecFragment::WildcardFeedback(feedback.to_string()));
    }

    Ok(CodecFragment::Codec(Codec {
        payload_type: payload_type.parse::<u8>()?,
        rtcp_feedback: vec![feedback.to_string()],
        ..Default::default()
    }))
}

/// decode_codec_attribute returns `None` for attributes that say nothing about
/// codecs.
pub(crate) fn decode_codec_attribute(attr: &str) -> Option<Result<CodecFragment>> {
    let key = attr.split(':').next().unwrap_or_default();
    match key {
        ATTR_KEY_RTPMAP => Some(parse_rtpmap(attr).map(CodecFragment::Codec)),
        ATTR_KEY_FMTP => Some(parse_fmtp(attr).map(CodecFragment::Codec)),
        ATTR_KEY_RTCPFB => Some(parse_rtcp_fb(attr)),
        _ => None,
    }
}

/// merge_codecs folds `codec` into `saved`. Scalar fields keep the first
/// non-empty value seen, feedback types accumulate without duplicates.
pub(crate) fn merge_codecs(saved: &mut Codec, codec: Codec) {
    if saved.name.is_empty() {
        saved.name = codec.name;
    }
    if saved.clock_rate == 0 {
        saved.clock_rate = codec.clock_rate;
    }
    if saved.encoding_parameters.is_empty() {
        saved.encoding_parameters = codec.encoding_parameters;
    }
    if saved.fmtp.is_empty() {
        saved.fmtp = codec.fmtp;
    }
    for rtcp_feedback in &codec.rtcp_feedback {
        saved.append_rtcp_feedback(rtcp_feedback);
    }
}

// static codecs that do not require a rtpmap
fn static_codecs() -> BTreeMap<u8, Codec> {
    [(0, "PCMU"), (8, "PCMA")]
        .into_iter()
        .map(|(payload_type, name)| {
            (
                payload_type,
                Codec {
                    payload_type,
                    name: name.to_owned(),
                    clock_rate: 8000,
                    ..Default::default()
                },
            )
        })
        .collect()
}

/// build_codec_map reconstructs every codec described by the `rtpmap`, `fmtp`
/// and `rtcp-fb` attributes of the given media sections. Attributes that fail
/// to decode are skipped.
pub(crate) fn build_codec_map(media_descriptions: &[MediaDescription]) -> BTreeMap<u8, Codec> {
    let attributes = media_descriptions.iter().flat_map(|m| m.attributes.iter());
    let (mut codecs, wildcard_rtcp_feedback) = attributes.fold(
        (static_codecs(), Vec::new()),
        |(mut codecs, mut wildcard_rtcp_feedback), a: &Attribute| {
            let attr = a.to_string();
            match decode_codec_attribute(&attr) {
                Some(Ok(CodecFragment::Codec(codec))) => {
                    let saved = codecs
                        .entry(codec.payload_type)
                        .or_insert_with(|| Codec {
                            payload_type: codec.payload_type,
                            ..Default::default()
                        });
                    merge_codecs(saved, codec);
                }
                Some(Ok(CodecFragment::WildcardFeedback(rtcp_feedback))) => {
                    wildcard_rtcp_feedback.push(rtcp_feedback);
                }
                Some(Err(err)) => trace!("skipping codec attribute `{attr}`: {err}"),
                None => {}
            }
            (codecs, wildcard_rtcp_feedback)
        },
    );

    for codec in codecs.values_mut() {
        for rtcp_feedback in &wildcard_rtcp_feedback {
            codec.append_rtcp_feedback(rtcp_feedback);
        }
    }

    codecs
}

fn equivalent_fmtp(want: &str, got: &str) -> bool {
    let mut want_split: Vec<&str> = want.split(';').map(str::trim).collect();
    let mut got_split: Vec<&str> = got.split(';').map(str::trim).collect();

    if want_split.len() != got_split.len() {
        return false;
    }

    want_split.sort_unstable();
    got_split.sort_unstable();

    want_split == got_split
}

/// codecs_match treats every empty field of `wanted` as a wildcard. Names
/// compare case-insensitively and fmtp parameters compare as unordered sets.
pub(crate) fn codecs_match(wanted: &Codec, got: &Codec) -> bool {
    if !wanted.name.is_empty() && !wanted.name.eq_ignore_ascii_case(&got.name) {
        return false;
    }
    if wanted.clock_rate != 0 && wanted.clock_rate != got.clock_rate {
        return false;
    }
    if !wanted.encoding_parameters.is_empty()
        && wanted.encoding_parameters != got.encoding_parameters
    {
        return false;
    }
    if !wanted.fmtp.is_empty() && !equivalent_fmtp(&wanted.fmtp, &got.fmtp) {
        return false;
    }

    true
}
