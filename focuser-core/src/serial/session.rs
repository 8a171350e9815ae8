//! Command session: parser, handler and frame logging for one serial link

use heapless::String;
use moonlite_protocol::{Handler, Parser, Response, FRAME_START};

/// Longest frame text kept for the RX log line
pub const MAX_LOGGED_FRAME_LEN: usize = 80;

/// Drives the protocol parser for a byte stream and logs traffic
pub struct CommandSession<H> {
    parser: Parser,
    handler: H,
    frame_log: String<MAX_LOGGED_FRAME_LEN>,
    frame_truncated: bool,
}

impl<H: Handler> CommandSession<H> {
    pub fn new(handler: H) -> Self {
        Self {
            parser: Parser::new(),
            handler,
            frame_log: String::new(),
            frame_truncated: false,
        }
    }

    /// Feed one received byte
    ///
    /// Returns the text to transmit when the byte completed a query frame.
    pub fn process(&mut self, byte: u8) -> Option<Response> {
        self.record(byte);

        let completion = self.parser.process(byte, &mut self.handler);
        if !completion.completed {
            return None;
        }

        if self.frame_truncated {
            info!("RX {}... (truncated)", self.frame_log.as_str());
        } else {
            info!("RX {}", self.frame_log.as_str());
        }

        match &completion.response {
            Some(response) => info!("TX {}", response.as_str()),
            None => debug!("command produced no response"),
        }

        self.frame_log.clear();
        self.frame_truncated = false;
        completion.response
    }

    fn record(&mut self, byte: u8) {
        if byte == FRAME_START {
            self.frame_log.clear();
            self.frame_truncated = false;
        } else if self.frame_log.is_empty() {
            return;
        }

        if self.frame_log.push(byte as char).is_err() {
            self.frame_truncated = true;
        }
    }

    /// Text of the frame currently being received
    pub fn frame_log(&self) -> &str {
        self.frame_log.as_str()
    }

    pub fn is_frame_truncated(&self) -> bool {
        self.frame_truncated
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Handler that answers from fixed values and counts setter calls
    #[derive(Default)]
    struct FixedHandler {
        position: u16,
        sets: u32,
    }

    impl Handler for FixedHandler {
        fn stop(&mut self) {
            self.sets += 1;
        }
        fn current_position(&mut self) -> u16 {
            self.position
        }
        fn set_current_position(&mut self, position: u16) {
            self.sets += 1;
            self.position = position;
        }
        fn new_position(&mut self) -> u16 {
            0
        }
        fn set_new_position(&mut self, _position: u16) {
            self.sets += 1;
        }
        fn go_to_new_position(&mut self) {
            self.sets += 1;
        }
        fn is_half_step(&mut self) -> bool {
            false
        }
        fn set_half_step(&mut self, _enabled: bool) {
            self.sets += 1;
        }
        fn is_moving(&mut self) -> bool {
            false
        }
        fn firmware_version(&mut self) -> &str {
            "10"
        }
        fn speed(&mut self) -> u8 {
            1
        }
        fn set_speed(&mut self, _speed: u8) {
            self.sets += 1;
        }
        fn temperature(&mut self) -> u16 {
            0
        }
        fn temperature_coefficient_raw(&mut self) -> u8 {
            0
        }
    }

    fn feed(session: &mut CommandSession<FixedHandler>, bytes: &[u8]) -> Vec<std::string::String> {
        bytes
            .iter()
            .filter_map(|&b| session.process(b))
            .map(|r| r.as_str().into())
            .collect()
    }

    #[test]
    fn test_query_gets_terminated_response() {
        let mut session = CommandSession::new(FixedHandler {
            position: 0x1234,
            ..Default::default()
        });
        assert_eq!(feed(&mut session, b":GP#"), ["1234#"]);
        assert_eq!(feed(&mut session, b":GV#"), ["10#"]);
    }

    #[test]
    fn test_set_commands_are_silent() {
        let mut session = CommandSession::new(FixedHandler::default());
        assert!(feed(&mut session, b":SP0010#:SN0200#:FG#:SD04#:SH#:FQ#").is_empty());
        assert_eq!(session.handler().sets, 6);
        assert_eq!(session.handler().position, 0x0010);
    }

    #[test]
    fn test_malformed_frames_are_silent() {
        let mut session = CommandSession::new(FixedHandler::default());
        assert!(feed(&mut session, b":SP12G#:XX#:GP12#garbage#").is_empty());
        assert_eq!(session.handler().sets, 0);
    }

    #[test]
    fn test_frame_log_tracks_current_frame() {
        let mut session = CommandSession::new(FixedHandler::default());
        feed(&mut session, b"noise:SN01");
        assert_eq!(session.frame_log(), ":SN01");

        feed(&mut session, b"00#");
        assert_eq!(session.frame_log(), "");
    }

    #[test]
    fn test_frame_log_truncates() {
        let mut session = CommandSession::new(FixedHandler::default());
        session.process(b':');
        for _ in 0..100 {
            session.process(b'x');
        }
        assert_eq!(session.frame_log().len(), MAX_LOGGED_FRAME_LEN);
        assert!(session.is_frame_truncated());

        // A new frame starts a fresh log and still parses
        assert_eq!(feed(&mut session, b":GP#"), ["0000#"]);
        assert!(!session.is_frame_truncated());
    }
}
