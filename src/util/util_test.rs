use super::*;
use crate::description::media::*;
use crate::description::session::*;

fn get_test_session_description() -> SessionDescription {
    SessionDescription{
        media_descriptions: vec![
            MediaDescription {
                media_name: MediaName {
                    media: "video".to_string(),
                    port: RangedPort {
                        value: 51372,
                        range: None,
                    },
                    protos: vec!["RTP".to_string(), "AVP".to_string()],
                    formats: vec!["120".to_string(), "121".to_string(), "126".to_string(), "97".to_string()],
                },
                attributes: vec![
                    Attribute::new("fmtp:126 profile-level-id=42e01f;level-asymmetry-allowed=1;packetization-mode=1".to_string(), None),
                    Attribute::new("fmtp:97 profile-level-id=42e01f;level-asymmetry-allowed=1".to_string(), None),
                    Attribute::new("fmtp:120 max-fs=12288;max-fr=60".to_string(), None),
                    Attribute::new("fmtp:121 max-fs=12288;max-fr=60".to_string(), None),
                    Attribute::new("rtpmap:120 VP8/90000".to_string(), None),
                    Attribute::new("rtpmap:121 VP9/90000".to_string(), None),
                    Attribute::new("rtpmap:126 H264/90000".to_string(), None),
                    Attribute::new("rtpmap:97 H264/90000".to_string(), None),
                    Attribute::new("rtcp-fb:97 ccm fir".to_string(), None),
                    Attribute::new("rtcp-fb:97 nack".to_string(), None),
                    Attribute::new("rtcp-fb:97 nack pli".to_string(), None),
                ],
                ..Default::default()
            },
        ],
        ..Default::default()
    }
}

fn media_with_attributes(attributes: &[&str]) -> SessionDescription {
    let media_description = attributes
        .iter()
        .fold(MediaDescription::default(), |m, attr| match attr.split_once(':') {
            Some((key, value)) => m.with_value_attribute(key.to_owned(), value.to_owned()),
            None => m.with_property_attribute((*attr).to_owned()),
        });

    SessionDescription::default().with_media(media_description)
}

#[test]
fn test_get_payload_type_for_vp8() -> Result<()> {
    let tests = vec![
        (
            Codec {
                name: "VP8".to_string(),
                ..Default::default()
            },
            120,
        ),
        (
            Codec {
                name: "VP9".to_string(),
                ..Default::default()
            },
            121,
        ),
        (
            Codec {
                name: "H264".to_string(),
                fmtp: "profile-level-id=42e01f;level-asymmetry-allowed=1".to_string(),
                ..Default::default()
            },
            97,
        ),
        (
            Codec {
                name: "H264".to_string(),
                fmtp: "level-asymmetry-allowed=1;profile-level-id=42e01f".to_string(),
                ..Default::default()
            },
            97,
        ),
        (
            Codec {
                name: "H264".to_string(),
                fmtp: "profile-level-id=42e01f;level-asymmetry-allowed=1;packetization-mode=1"
                    .to_string(),
                ..Default::default()
            },
            126,
        ),
    ];

    for (codec, expected) in tests {
        let sdp = get_test_session_description();
        let actual = sdp.get_payload_type_for_codec(&codec)?;
        assert_eq!(actual, expected);
    }

    Ok(())
}

#[test]
fn test_get_codec_for_payload_type() -> Result<()> {
    let tests: Vec<(u8, Codec)> = vec![
        (
            120,
            Codec {
                payload_type: 120,
                name: "VP8".to_string(),
                clock_rate: 90000,
                fmtp: "max-fs=12288;max-fr=60".to_string(),
                ..Default::default()
            },
        ),
        (
            121,
            Codec {
                payload_type: 121,
                name: "VP9".to_string(),
                clock_rate: 90000,
                fmtp: "max-fs=12288;max-fr=60".to_string(),
                ..Default::default()
            },
        ),
        (
            126,
            Codec {
                payload_type: 126,
                name: "H264".to_string(),
                clock_rate: 90000,
                fmtp: "profile-level-id=42e01f;level-asymmetry-allowed=1;packetization-mode=1"
                    .to_string(),
                ..Default::default()
            },
        ),
        (
            97,
            Codec {
                payload_type: 97,
                name: "H264".to_string(),
                clock_rate: 90000,
                fmtp: "profile-level-id=42e01f;level-asymmetry-allowed=1".to_string(),
                rtcp_feedback: vec![
                    "ccm fir".to_string(),
                    "nack".to_string(),
                    "nack pli".to_string(),
                ],
                ..Default::default()
            },
        ),
    ];

    for (payload_type, expected) in &tests {
        let sdp = get_test_session_description();
        let actual = sdp.get_codec_for_payload_type(*payload_type)?;
        assert_eq!(actual, *expected);
    }

    Ok(())
}

#[test]
fn test_get_codec_for_payload_type_not_found() {
    let sdp = get_test_session_description();
    assert_eq!(
        sdp.get_codec_for_payload_type(96),
        Err(Error::PayloadTypeNotFound)
    );
}

#[test]
fn test_static_codecs_without_rtpmap() -> Result<()> {
    let sdp = SessionDescription::default();

    let pcmu = sdp.get_codec_for_payload_type(0)?;
    assert_eq!(pcmu.name, "PCMU");
    assert_eq!(pcmu.clock_rate, 8000);

    let pcma = sdp.get_codec_for_payload_type(8)?;
    assert_eq!(pcma.name, "PCMA");
    assert_eq!(pcma.clock_rate, 8000);

    Ok(())
}

#[test]
fn test_merge_rtpmap_and_fmtp() -> Result<()> {
    let sdp = media_with_attributes(&["rtpmap:99 h263-1998/90000", "fmtp:99 custom=1"]);

    assert_eq!(
        sdp.get_codec_for_payload_type(99)?,
        Codec {
            payload_type: 99,
            name: "h263-1998".to_string(),
            clock_rate: 90000,
            fmtp: "custom=1".to_string(),
            ..Default::default()
        }
    );

    Ok(())
}

#[test]
fn test_merge_keeps_first_non_empty_value() -> Result<()> {
    let sdp = media_with_attributes(&[
        "fmtp:111 minptime=10;useinbandfec=1",
        "rtpmap:111 opus/48000/2",
        "rtpmap:111 OPUS/16000/1",
        "fmtp:111 stereo=1",
    ]);

    let codec = sdp.get_codec_for_payload_type(111)?;
    assert_eq!(codec.name, "opus");
    assert_eq!(codec.clock_rate, 48000);
    assert_eq!(codec.encoding_parameters, "2");
    assert_eq!(codec.fmtp, "minptime=10;useinbandfec=1");

    Ok(())
}

#[test]
fn test_merge_across_media_descriptions() -> Result<()> {
    let sdp = media_with_attributes(&["rtpmap:96 VP8/90000"]).with_media(
        MediaDescription::default()
            .with_value_attribute("rtcp-fb".to_owned(), "96 goog-remb".to_owned()),
    );

    let codec = sdp.get_codec_for_payload_type(96)?;
    assert_eq!(codec.name, "VP8");
    assert_eq!(codec.rtcp_feedback, vec!["goog-remb".to_string()]);

    Ok(())
}

#[test]
fn test_wildcard_rtcp_feedback() -> Result<()> {
    let sdp = media_with_attributes(&[
        "rtpmap:97 H264/90000",
        "rtcp-fb:97 nack",
        "rtcp-fb:* nack",
        "rtcp-fb:* transport-cc",
        "rtcp-fb:* transport-cc",
    ]);

    let codec = sdp.get_codec_for_payload_type(97)?;
    assert_eq!(
        codec.rtcp_feedback,
        vec!["nack".to_string(), "transport-cc".to_string()]
    );

    // static codecs receive wildcard feedback too
    let codec = sdp.get_codec_for_payload_type(0)?;
    assert_eq!(
        codec.rtcp_feedback,
        vec!["nack".to_string(), "transport-cc".to_string()]
    );

    Ok(())
}

#[test]
fn test_rtcp_feedback_dedup() -> Result<()> {
    let sdp = media_with_attributes(&[
        "rtcp-fb:100 nack",
        "rtcp-fb:100 nack",
        "rtcp-fb:100 nack pli",
    ]);

    let codec = sdp.get_codec_for_payload_type(100)?;
    assert_eq!(codec.name, "");
    assert_eq!(
        codec.rtcp_feedback,
        vec!["nack".to_string(), "nack pli".to_string()]
    );

    Ok(())
}

#[test]
fn test_malformed_codec_attributes_are_skipped() -> Result<()> {
    let sdp = media_with_attributes(&[
        "rtpmap:abc VP8/90000",
        "rtpmap:300 VP8/90000",
        "rtpmap:98 VP8/ninety",
        "rtpmap:98",
        "fmtp:98",
        "rtcp-fb:98",
        "rtpmap:96 VP8/90000",
    ]);

    assert_eq!(sdp.get_codec_for_payload_type(96)?.name, "VP8");
    assert_eq!(
        sdp.get_codec_for_payload_type(98),
        Err(Error::PayloadTypeNotFound)
    );

    Ok(())
}

#[test]
fn test_get_codecs_for_payload_types() {
    let sdp = get_test_session_description();

    let codecs = sdp.get_codecs_for_payload_types(&[97, 55, 120, 8]);
    let payload_types: Vec<u8> = codecs.iter().map(|c| c.payload_type).collect();
    assert_eq!(payload_types, vec![97, 120, 8]);

    assert!(sdp.get_codecs_for_payload_types(&[]).is_empty());
}

#[test]
fn test_get_payload_type_for_codec_fmtp_equivalence() -> Result<()> {
    let sdp = media_with_attributes(&["rtpmap:100 custom/90000", "fmtp:100 a=2; b=1"]);

    let wanted = Codec {
        name: "CUSTOM".to_string(),
        fmtp: "b=1;a=2".to_string(),
        ..Default::default()
    };
    assert_eq!(sdp.get_payload_type_for_codec(&wanted)?, 100);

    let wanted = Codec {
        name: "custom".to_string(),
        fmtp: "a=2;b=1;c=3".to_string(),
        ..Default::default()
    };
    assert_eq!(
        sdp.get_payload_type_for_codec(&wanted),
        Err(Error::CodecNotFound)
    );

    Ok(())
}

#[test]
fn test_get_payload_type_for_codec_is_ascending() -> Result<()> {
    let sdp = media_with_attributes(&["rtpmap:111 opus/48000/2", "rtpmap:109 opus/48000/2"]);

    let wanted = Codec {
        name: "opus".to_string(),
        ..Default::default()
    };
    assert_eq!(sdp.get_payload_type_for_codec(&wanted)?, 109);

    let wanted = Codec {
        clock_rate: 8000,
        ..Default::default()
    };
    assert_eq!(sdp.get_payload_type_for_codec(&wanted)?, 0);

    Ok(())
}

#[test]
fn test_codecs_match() {
    let got = Codec {
        payload_type: 111,
        name: "opus".to_string(),
        clock_rate: 48000,
        encoding_parameters: "2".to_string(),
        fmtp: "minptime=10;useinbandfec=1".to_string(),
        ..Default::default()
    };

    assert!(codecs_match(&Codec::default(), &got));
    assert!(codecs_match(
        &Codec {
            name: "OPUS".to_string(),
            clock_rate: 48000,
            encoding_parameters: "2".to_string(),
            fmtp: " useinbandfec=1 ; minptime=10".to_string(),
            ..Default::default()
        },
        &got
    ));
    assert!(!codecs_match(
        &Codec {
            clock_rate: 16000,
            ..Default::default()
        },
        &got
    ));
    assert!(!codecs_match(
        &Codec {
            encoding_parameters: "1".to_string(),
            ..Default::default()
        },
        &got
    ));
    assert!(!codecs_match(
        &Codec {
            fmtp: "minptime=10".to_string(),
            ..Default::default()
        },
        &got
    ));
}

#[test]
fn test_parse_codec_attributes() -> Result<()> {
    assert_eq!(
        parse_rtpmap("rtpmap:111 opus/48000/2")?,
        Codec {
            payload_type: 111,
            name: "opus".to_string(),
            clock_rate: 48000,
            encoding_parameters: "2".to_string(),
            ..Default::default()
        }
    );
    assert_eq!(
        parse_fmtp("fmtp:100 a=2; b=1")?,
        Codec {
            payload_type: 100,
            fmtp: "a=2; b=1".to_string(),
            ..Default::default()
        }
    );
    assert_eq!(
        parse_rtcp_fb("rtcp-fb:* ccm fir")?,
        CodecFragment::WildcardFeedback("ccm fir".to_string())
    );
    assert_eq!(
        parse_rtcp_fb("rtcp-fb:97 nack pli")?,
        CodecFragment::Codec(Codec {
            payload_type: 97,
            rtcp_feedback: vec!["nack pli".to_string()],
            ..Default::default()
        })
    );

    assert_eq!(parse_rtpmap("rtpmap:111"), Err(Error::MissingWhitespace));
    assert_eq!(parse_fmtp("fmtp 100 a=1"), Err(Error::MissingColon));
    assert!(decode_codec_attribute("candidate:0 1 UDP 1 203.0.113.1 54400 typ host").is_none());
    assert!(decode_codec_attribute("rtpmap-ish:1 x").is_none());

    Ok(())
}

#[test]
fn test_codec_display() {
    let codec = Codec {
        payload_type: 97,
        name: "H264".to_string(),
        clock_rate: 90000,
        fmtp: "packetization-mode=1".to_string(),
        rtcp_feedback: vec!["nack".to_string(), "nack pli".to_string()],
        ..Default::default()
    };

    assert_eq!(
        codec.to_string(),
        "97 H264/90000/ (packetization-mode=1) [nack, nack pli]"
    );
}

#[test]
fn test_new_session_id() -> Result<()> {
    let mut min = 0x7FFFFFFFFFFFFFFFu64;
    let mut max = 0u64;
    for _ in 0..10000 {
        let r = new_session_id()?;

        if r > (1 << 63) - 1 {
            panic!("Session ID must be less than 2**64-1, got {r}")
        }
        if r < min {
            min = r
        }
        if r > max {
            max = r
        }
    }
    if min > 0x1000000000000000 {
        panic!("Value around lower boundary was not generated")
    }
    if max < 0x7000000000000000 {
        panic!("Value around upper boundary was not generated")
    }

    Ok(())
}

struct ConstRng(u8);

impl RngCore for ConstRng {
    fn next_u32(&mut self) -> u32 {
        u32::from_ne_bytes([self.0; 4])
    }

    fn next_u64(&mut self) -> u64 {
        u64::from_ne_bytes([self.0; 8])
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        dest.fill(self.0)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> std::result::Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

struct NoEntropy;

impl RngCore for NoEntropy {
    fn next_u32(&mut self) -> u32 {
        0
    }

    fn next_u64(&mut self) -> u64 {
        0
    }

    fn fill_bytes(&mut self, _dest: &mut [u8]) {}

    fn try_fill_bytes(&mut self, _dest: &mut [u8]) -> std::result::Result<(), rand::Error> {
        Err(rand::Error::new("entropy source unavailable"))
    }
}

#[test]
fn test_new_session_id_clears_top_bit() -> Result<()> {
    assert_eq!(new_session_id_with(&mut ConstRng(0xFF))?, u64::MAX >> 1);
    assert_eq!(new_session_id_with(&mut ConstRng(0x00))?, 0);

    Ok(())
}

#[test]
fn test_new_session_id_propagates_rng_error() {
    assert!(matches!(
        new_session_id_with(&mut NoEntropy),
        Err(Error::Rand(_))
    ));
}

#[test]
fn test_connection_role() {
    for role in ["active", "passive", "actpass", "holdconn"] {
        assert_eq!(ConnectionRole::from(role).to_string(), role);
    }
    assert_eq!(ConnectionRole::from("bogus"), ConnectionRole::Unspecified);
}
