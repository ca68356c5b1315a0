
/// State is a node of the unmarshal automaton. Every state except `Start` is
/// named after the record that was consumed to reach it, so the state also
/// tells the decoder which field the record's value belongs to.
///
/// The automaton was derived from the RFC 4566 §5 grammar
///
/// ```text
/// vosi?u?e?p?c?b*(tr*)+z?k?a*(mi?c?b*k?a*)*
/// ```
///
/// with one relaxation: inside a media description the `i`, `c`, `b`, `k` and
/// `a` lines are accepted in any order, because that is what real producers
/// emit. Marshal always writes them back in grammar order.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum State {
    #[default]
    Start,
    Version,
    Origin,
    SessionName,
    SessionInformation,
    Uri,
    EmailAddress,
    PhoneNumber,
    SessionConnectionInformation,
    SessionBandwidth,
    Timing,
    RepeatTimes,
    TimeZones,
    SessionEncryptionKey,
    SessionAttribute,
    MediaName,
    MediaTitle,
    MediaConnectionInformation,
    MediaBandwidth,
    MediaEncryptionKey,
    MediaAttribute,
}

impl State {
    /// next returns the state reached by consuming a record of type `key`, or
    /// `None` if the grammar does not allow that record here.
    pub fn next(self, key: u8) -> Option<State> {
        use State::*;

        let next = match (self, key) {
            (Start, b'v') => Version,
            (Version, b'o') => Origin,
            (Origin, b's') => SessionName,

            (SessionName, b'i') => SessionInformation,
            (SessionName | SessionInformation, b'u') => Uri,
            (SessionName | SessionInformation | Uri, b'e') => EmailAddress,
            (SessionName | SessionInformation | Uri | EmailAddress, b'p') => PhoneNumber,
            (SessionName | SessionInformation | Uri | EmailAddress | PhoneNumber, b'c') => {
                SessionConnectionInformation
            }
            (
                SessionName
                | SessionInformation
                | Uri
                | EmailAddress
                | PhoneNumber
                | SessionConnectionInformation
                | SessionBandwidth,
                b'b',
            ) => SessionBandwidth,
            (
                SessionName
                | SessionInformation
                | Uri
                | EmailAddress
                | PhoneNumber
                | SessionConnectionInformation
                | SessionBandwidth
                | Timing
                | RepeatTimes,
                b't',
            ) => Timing,

            (Timing | RepeatTimes, b'r') => RepeatTimes,
            (Timing | RepeatTimes, b'z') => TimeZones,
            (Timing | RepeatTimes | TimeZones, b'k') => SessionEncryptionKey,
            (
                Timing | RepeatTimes | TimeZones | SessionEncryptionKey | SessionAttribute,
                b'a',
            ) => SessionAttribute,

            (s, b'm') if s.accepts_media() => MediaName,
            (s, b'i') if s.in_media() => MediaTitle,
            (s, b'c') if s.in_media() => MediaConnectionInformation,
            (s, b'b') if s.in_media() => MediaBandwidth,
            (s, b'k') if s.in_media() => MediaEncryptionKey,
            (s, b'a') if s.in_media() => MediaAttribute,

            _ => return None,
        };

        Some(next)
    }

    /// is_terminal reports whether the input may end in this state. All of
    /// them come after at least one `t=` line.
    pub fn is_terminal(self) -> bool {
        self.accepts_media()
    }

    fn accepts_media(self) -> bool {
        matches!(
            self,
            State::Timing
                | State::RepeatTimes
                | State::TimeZones
                | State::SessionEncryptionKey
                | State::SessionAttribute
        ) || self.in_media()
    }

    fn in_media(self) -> bool {
        matches!(
            self,
            State::MediaName
                | State::MediaTitle
                | State::MediaConnectionInformation
                | State::MediaBandwidth
                | State::MediaEncryptionKey
                | State::MediaAttribute
        )
    }
}
