//! TwiML document construction.
//!
//! The responses here are fixed templates; the only branching the
//! handlers do is "agent available / not".

const HEADER: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>";

/// Escape the five XML-reserved characters for attribute/text content.
fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[derive(Default)]
pub struct TwimlResponse {
    parts: Vec<String>,
}

impl TwimlResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn say(mut self, message: &str) -> Self {
        self.parts
            .push(format!("<Say voice=\"alice\">{}</Say>", escape(message)));
        self
    }

    /// One media-stream leg. Twilio forks the selected audio track to
    /// the given WebSocket consumer.
    pub fn start_stream(mut self, url: &str, track: &str, name: &str) -> Self {
        self.parts.push(format!(
            "<Start><Stream url=\"{}\" track=\"{}\" name=\"{}\" /></Start>",
            escape(url),
            escape(track),
            escape(name)
        ));
        self
    }

    /// Customer-audio and agent-audio legs pointed at the transcription
    /// consumer.
    pub fn stream_both_tracks(self, url: &str) -> Self {
        self.start_stream(url, "inbound_track", "customer-stream")
            .start_stream(url, "outbound_track", "agent-stream")
    }

    /// Dial the agent's browser client with recording enabled.
    pub fn dial_client(mut self, identity: &str, status_callback: &str) -> Self {
        self.parts.push(format!(
            "<Dial timeout=\"30\" record=\"record-from-ringing\" recordingStatusCallback=\"{}\"><Client>{}</Client></Dial>",
            escape(status_callback),
            escape(identity)
        ));
        self
    }

    /// Dial out to a PSTN number with our number as caller id.
    pub fn dial_number(mut self, number: &str, caller_id: &str, status_callback: &str) -> Self {
        self.parts.push(format!(
            "<Dial callerId=\"{}\" timeout=\"30\" record=\"record-from-ringing\" recordingStatusCallback=\"{}\" action=\"{}\"><Number>{}</Number></Dial>",
            escape(caller_id),
            escape(status_callback),
            escape(status_callback),
            escape(number)
        ));
        self
    }

    pub fn hangup(mut self) -> Self {
        self.parts.push("<Hangup/>".to_string());
        self
    }

    pub fn build(self) -> String {
        format!("{HEADER}<Response>{}</Response>", self.parts.concat())
    }
}

/// Empty acknowledgement for call states we take no action on.
pub fn empty() -> String {
    format!("{HEADER}<Response></Response>")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inbound_answer_has_two_streams_and_one_client_dial() {
        let xml = TwimlResponse::new()
            .say("Connecting you to our agent.")
            .stream_both_tracks("wss://example.com/stream")
            .dial_client("agent", "https://example.com/webhooks/twilio/status")
            .build();

        assert_eq!(xml.matches("<Stream").count(), 2);
        assert_eq!(xml.matches("<Dial").count(), 1);
        assert!(xml.contains("<Client>agent</Client>"));
        assert!(xml.contains("track=\"inbound_track\""));
        assert!(xml.contains("track=\"outbound_track\""));
        assert!(!xml.contains("<Hangup/>"));
    }

    #[test]
    fn no_agent_response_hangs_up_without_dialing() {
        let xml = TwimlResponse::new()
            .say("All our agents are currently busy. Please try again later.")
            .hangup()
            .build();

        assert!(xml.contains("<Hangup/>"));
        assert!(!xml.contains("<Dial"));
        assert!(!xml.contains("<Stream"));
    }

    #[test]
    fn outbound_dial_carries_caller_id() {
        let xml = TwimlResponse::new()
            .stream_both_tracks("wss://example.com/stream")
            .dial_number("+15559876543", "+17655550100", "https://example.com/status")
            .build();

        assert!(xml.contains("callerId=\"+17655550100\""));
        assert!(xml.contains("<Number>+15559876543</Number>"));
    }

    #[test]
    fn escapes_reserved_characters() {
        let xml = TwimlResponse::new().say("Tom & Jerry <live>").build();
        assert!(xml.contains("Tom &amp; Jerry &lt;live&gt;"));
    }

    #[test]
    fn empty_response() {
        assert_eq!(
            empty(),
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?><Response></Response>"
        );
    }
}
