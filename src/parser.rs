//! Extraction of latency and packet loss from the text printed by `ping`.
//!
//! Output differs between platforms (`time=14.2 ms`, `time=14ms`, `time<1ms`,
//! `0% packet loss`, `(0% loss)`), so matching is marker based and case
//! insensitive. Anything that cannot be read degrades to the sentinel pair.

use crate::models::{TOTAL_LOSS, UNREACHABLE_LATENCY};

const LATENCY_MARKERS: &[&str] = &["time=", "time<"];
const LOSS_MARKERS: &[&str] = &["% packet loss", "% loss"];

/// Returns `(latency_ms, packet_loss_percent)`.
///
/// Latency is the lowest round trip seen on any reply line. Packet loss comes
/// from the first summary line that carries a readable percentage.
pub fn parse_output(raw: &str) -> (f64, f64) {
    let mut latency = UNREACHABLE_LATENCY;
    let mut packet_loss = None;

    for line in raw.lines() {
        let line = line.to_lowercase();

        if let Some(value) = latency_in(&line) {
            latency = latency.min(value);
        }

        if packet_loss.is_none() {
            packet_loss = loss_in(&line);
        }
    }

    (latency, packet_loss.unwrap_or(TOTAL_LOSS))
}

fn latency_in(line: &str) -> Option<f64> {
    let rest = LATENCY_MARKERS
        .iter()
        .find_map(|marker| line.find(marker).map(|at| &line[at + marker.len()..]))?;
    let token = rest.split_whitespace().next()?;
    let digits: String = token
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    digits.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn loss_in(line: &str) -> Option<f64> {
    let at = LOSS_MARKERS.iter().find_map(|marker| line.find(marker))?;
    let before = &line[..at];
    let start = before
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit() || *c == '.')
        .last()
        .map_or(before.len(), |(i, _)| i);
    before[start..]
        .parse::<f64>()
        .ok()
        .filter(|v| (0.0..=100.0).contains(v))
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINUX: &str = "PING 8.8.8.8 (8.8.8.8) 56(84) bytes of data.
64 bytes from 8.8.8.8: icmp_seq=1 ttl=117 time=14.6 ms
64 bytes from 8.8.8.8: icmp_seq=2 ttl=117 time=12.1 ms
64 bytes from 8.8.8.8: icmp_seq=3 ttl=117 time=13.9 ms

--- 8.8.8.8 ping statistics ---
3 packets transmitted, 3 received, 0% packet loss, time 2003ms
rtt min/avg/max/mdev = 12.1/13.5/14.6/1.0 ms
";

    const WINDOWS: &str = "Pinging 1.1.1.1 with 32 bytes of data:
Reply from 1.1.1.1: bytes=32 time=9ms TTL=57
Reply from 1.1.1.1: bytes=32 time<1ms TTL=57
Request timed out.

Ping statistics for 1.1.1.1:
    Packets: Sent = 3, Received = 2, Lost = 1 (33% loss),
";

    const MACOS: &str = "PING 9.9.9.9 (9.9.9.9): 56 data bytes
64 bytes from 9.9.9.9: icmp_seq=0 ttl=58 time=21.337 ms

--- 9.9.9.9 ping statistics ---
2 packets transmitted, 1 packets received, 50.0% packet loss
";

    #[test]
    fn linux_output() {
        assert_eq!(parse_output(LINUX), (12.1, 0.0));
    }

    #[test]
    fn windows_output() {
        assert_eq!(parse_output(WINDOWS), (1.0, 33.0));
    }

    #[test]
    fn macos_output() {
        assert_eq!(parse_output(MACOS), (21.337, 50.0));
    }

    #[test]
    fn latency_never_exceeds_a_seen_token() {
        let (latency, _) = parse_output("reply TIME=123.4ms\nreply time=200 ms");
        assert!(latency <= 123.4);
        assert_eq!(latency, 123.4);
    }

    #[test]
    fn loss_with_short_marker() {
        assert_eq!(parse_output("Lost = 1 (20% loss)").1, 20.0);
    }

    #[test]
    fn unknown_text_yields_sentinels() {
        assert_eq!(parse_output(""), (999.0, 100.0));
        assert_eq!(parse_output("ping: unknown host nowhere.invalid"), (999.0, 100.0));
        // total loss keeps the sentinel latency but reports the real loss
        assert_eq!(
            parse_output("2 packets transmitted, 0 received, 100% packet loss"),
            (999.0, 100.0)
        );
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let raw = "time=\ntime=abc ms\ntime=1.2.3 ms\ntime=42 ms\n% loss\nxx% loss\n5% packet loss";
        assert_eq!(parse_output(raw), (42.0, 5.0));
    }
}
