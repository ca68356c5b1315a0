
use super::common::*;
use super::media::*;
use super::session::*;
use crate::error::{Error, Result};

// Set according to currently registered with IANA
// https://tools.ietf.org/html/rfc4566#section-8.2.6
const NETWORK_TYPES: &[&str] = &["IN"];

// https://tools.ietf.org/html/rfc4566#section-8.2.7
const ADDRESS_TYPES: &[&str] = &["IP4", "IP6"];

// https://tools.ietf.org/html/rfc4566#section-5.8
// https://datatracker.ietf.org/doc/html/rfc3556
// https://datatracker.ietf.org/doc/html/rfc3890
const BANDWIDTH_TYPES: &[&str] = &["CT", "AS", "TIAS", "RS", "RR"];

// https://tools.ietf.org/html/rfc4566#section-5.14
// including "image", registered here:
// https://datatracker.ietf.org/doc/html/rfc6466
const MEDIA_TYPES: &[&str] = &["audio", "video", "text", "application", "message", "image"];

fn invalid_value(value: &str) -> Error {
    Error::SdpInvalidValue(value.to_owned())
}

fn parse_number<T: std::str::FromStr>(value: &str) -> Result<T> {
    value.parse::<T>().map_err(|_| invalid_value(value))
}

pub(crate) fn unmarshal_protocol_version(value: &str) -> Result<Version> {
    let version = parse_number::<u32>(value.trim())?;

    // As off the latest draft of the rfc this value is required to be 0.
    // https://tools.ietf.org/html/draft-ietf-rtcweb-jsep-24#section-5.8.1
    if version != 0 {
        return Err(invalid_value(value));
    }

    Ok(version as Version)
}

/// unmarshal_origin decodes `o=<username> <sess-id> <sess-version> <nettype> <addrtype> <unicast-address>`.
///
/// Some producers drop the trailing tokens. The address type then falls back
/// to `IP4` and the address to the unspecified address of that family.
pub(crate) fn unmarshal_origin(value: &str) -> Result<Origin> {
    let fields: Vec<&str> = value.split_whitespace().collect();
    if fields.len() < 3 {
        return Err(Error::SdpFieldMissing(format!("`o={value}`")));
    }
    if fields.len() > 6 {
        return Err(Error::SdpInvalidSyntax(format!("`o={value}`")));
    }

    let session_id = parse_number::<u64>(fields[1])?;
    let session_version = parse_number::<u64>(fields[2])?;

    let network_type = *fields
        .get(3)
        .ok_or_else(|| Error::SdpFieldMissing(format!("`o={value}`")))?;
    if !NETWORK_TYPES.contains(&network_type) {
        return Err(invalid_value(network_type));
    }

    let address_type = fields.get(4).copied().unwrap_or("IP4");
    if !ADDRESS_TYPES.contains(&address_type) {
        return Err(invalid_value(address_type));
    }

    let unicast_address = match fields.get(5) {
        Some(address) => (*address).to_owned(),
        None if address_type == "IP6" => "::".to_owned(),
        None => "0.0.0.0".to_owned(),
    };

    Ok(Origin {
        username: fields[0].to_owned(),
        session_id,
        session_version,
        network_type: network_type.to_owned(),
        address_type: address_type.to_owned(),
        unicast_address,
    })
}

pub(crate) fn unmarshal_connection_information(value: &str) -> Result<ConnectionInformation> {
    let fields: Vec<&str> = value.split_whitespace().collect();
    if fields.len() < 2 {
        return Err(Error::SdpInvalidSyntax(format!("`c={value}`")));
    }

    if !NETWORK_TYPES.contains(&fields[0]) {
        return Err(invalid_value(fields[0]));
    }
    if !ADDRESS_TYPES.contains(&fields[1]) {
        return Err(invalid_value(fields[1]));
    }

    let address = match fields.get(2) {
        Some(address) => Some(unmarshal_address(fields[1], address)?),
        None => None,
    };

    Ok(ConnectionInformation {
        network_type: fields[0].to_owned(),
        address_type: fields[1].to_owned(),
        address,
    })
}

/// unmarshal_address splits `<base>[/<ttl>][/<range>]`. Only IP4 multicast
/// addresses carry a TTL, so for IP6 the single suffix is the range.
fn unmarshal_address(address_type: &str, value: &str) -> Result<Address> {
    let parts: Vec<&str> = value.split('/').collect();
    let suffix = |i: usize| -> Result<Option<isize>> {
        parts.get(i).map(|p| parse_number::<isize>(p)).transpose()
    };

    let (ttl, range) = match (address_type, parts.len()) {
        (_, 1) => (None, None),
        ("IP4", 2) => (suffix(1)?, None),
        ("IP4", 3) => (suffix(1)?, suffix(2)?),
        ("IP6", 2) => (None, suffix(1)?),
        _ => return Err(invalid_value(value)),
    };

    Ok(Address {
        address: parts[0].to_owned(),
        ttl,
        range,
    })
}

pub(crate) fn unmarshal_bandwidth(value: &str) -> Result<Bandwidth> {
    let parts: Vec<&str> = value.split(':').collect();
    if parts.len() != 2 {
        return Err(Error::SdpInvalidSyntax(format!("`b={value}`")));
    }

    let (experimental, bandwidth_type) = match parts[0].strip_prefix("X-") {
        Some(bandwidth_type) => (true, bandwidth_type),
        None => {
            if !BANDWIDTH_TYPES.contains(&parts[0]) {
                return Err(invalid_value(parts[0]));
            }
            (false, parts[0])
        }
    };

    Ok(Bandwidth {
        experimental,
        bandwidth_type: bandwidth_type.to_owned(),
        bandwidth: parse_number::<u64>(parts[1])?,
    })
}

pub(crate) fn unmarshal_timing(value: &str) -> Result<Timing> {
    let fields: Vec<&str> = value.split_whitespace().collect();
    if fields.len() != 2 {
        return Err(Error::SdpInvalidSyntax(format!("`t={value}`")));
    }

    Ok(Timing {
        start_time: parse_number::<u64>(fields[0])?,
        stop_time: parse_number::<u64>(fields[1])?,
    })
}

/// unmarshal_repeat_time decodes `r=<repeat interval> <active duration> <offsets from start-time>`.
/// At least one offset is required.
pub(crate) fn unmarshal_repeat_time(value: &str) -> Result<RepeatTime> {
    let mut fields = value.split_whitespace();

    let interval = parse_time_units(fields.next().unwrap_or_default())?;
    let duration = parse_time_units(fields.next().unwrap_or_default())?;
    let offsets = fields.map(parse_time_units).collect::<Result<Vec<i64>>>()?;
    if offsets.is_empty() {
        return Err(Error::SdpInvalidValue(format!("`r={value}`")));
    }

    Ok(RepeatTime {
        interval,
        duration,
        offsets,
    })
}

pub(crate) fn unmarshal_time_zones(value: &str) -> Result<Vec<TimeZone>> {
    // These fields are transimitted in pairs
    // z=<adjustment time> <offset> <adjustment time> <offset> ....
    // so we are making sure that there are actually multiple of 2 total.
    let fields: Vec<&str> = value.split_whitespace().collect();
    if fields.is_empty() {
        return Err(Error::SdpInvalidValue(format!("`z={value}`")));
    }
    if fields.len() % 2 != 0 {
        return Err(Error::SdpInvalidSyntax(format!("`z={value}`")));
    }

    fields
        .chunks(2)
        .map(|pair| {
            Ok(TimeZone {
                adjustment_time: parse_number::<u64>(pair[0])?,
                offset: parse_time_units(pair[1])?,
            })
        })
        .collect()
}

pub(crate) fn unmarshal_attribute(value: &str) -> Attribute {
    match value.split_once(':') {
        Some((key, value)) => Attribute::new(key.to_owned(), Some(value.to_owned())),
        None => Attribute::new(value.to_owned(), None),
    }
}

pub(crate) fn unmarshal_media_name(value: &str) -> Result<MediaName> {
    let fields: Vec<&str> = value.split_whitespace().collect();
    if fields.len() < 4 {
        return Err(Error::SdpInvalidSyntax(format!("`m={value}`")));
    }

    // <media>
    if !MEDIA_TYPES.contains(&fields[0]) {
        return Err(invalid_value(fields[0]));
    }

    // <port>
    let port = unmarshal_port(fields[1])?;

    // <proto>
    // Transport protocols are left open: RTP/AVP, TCP/MSRP, UDP/BFCP, TCP/TLS/MRCPv2, ...
    let protos = fields[2].split('/').map(|p| p.to_owned()).collect();

    // <fmt>...
    let formats = fields[3..].iter().map(|f| (*f).to_owned()).collect();

    Ok(MediaName {
        media: fields[0].to_owned(),
        port,
        protos,
        formats,
    })
}

/// unmarshal_port decodes `<port>[/<number of ports>]`. The port must be plain
/// decimal digits within 0..=65535.
pub(crate) fn unmarshal_port(value: &str) -> Result<RangedPort> {
    let (port, range) = match value.split_once('/') {
        Some((port, range)) => (port, Some(range)),
        None => (value, None),
    };

    if port.is_empty() || !port.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::SdpInvalidPortValue(value.to_owned()));
    }
    let port = port
        .parse::<u16>()
        .map_err(|_| Error::SdpInvalidPortValue(value.to_owned()))?;

    let range = range
        .map(|r| parse_number::<i32>(r).map(|r| r as isize))
        .transpose()?;

    Ok(RangedPort {
        value: port as isize,
        range,
    })
}

/// parse_time_units converts the shorthand notation allowed for repeat times
/// and time zone offsets (`d`, `h`, `m`, `s` suffixes) to seconds.
pub(crate) fn parse_time_units(value: &str) -> Result<i64> {
    let val = value.as_bytes();
    let len = val.len();
    let (num, factor) = match val.last() {
        Some(b'd') => (&value[..len - 1], 86400), // days
        Some(b'h') => (&value[..len - 1], 3600),  // hours
        Some(b'm') => (&value[..len - 1], 60),    // minutes
        Some(b's') => (&value[..len - 1], 1),     // seconds (allowed for completeness)
        _ => (value, 1),
    };
    num.parse::<i64>()
        .ok()
        .and_then(|n| n.checked_mul(factor))
        .ok_or_else(|| invalid_value(value))
}
