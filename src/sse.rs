//! Decoder for OpenAI-style server-sent chat completion chunks.

use crate::agent::SummarizeError;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct Chunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: Delta,
}

#[derive(Debug, Default, Deserialize)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

/// Incremental line decoder. Bytes may arrive split anywhere, including
/// inside a UTF-8 sequence.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    done: bool,
}

impl SseDecoder {
    /// Whether the `[DONE]` sentinel has been seen; nothing after it is decoded
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Feed raw bytes, returning the content fragments of every complete line.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Result<String, SummarizeError>> {
        let mut out = Vec::new();
        if self.done {
            return out;
        }
        self.buffer.extend_from_slice(bytes);

        while let Some(newline_pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline_pos).collect();
            let line = String::from_utf8_lossy(&line);
            if let Some(result) = self.decode_line(line.trim()) {
                out.push(result);
            }
            if self.done {
                self.buffer.clear();
                break;
            }
        }
        out
    }

    /// Decode whatever is left once the body has ended. Some servers omit
    /// the final newline.
    pub fn finish(&mut self) -> Vec<Result<String, SummarizeError>> {
        if self.done || self.buffer.is_empty() {
            return Vec::new();
        }
        let rest = std::mem::take(&mut self.buffer);
        let line = String::from_utf8_lossy(&rest);
        self.decode_line(line.trim()).into_iter().collect()
    }

    fn decode_line(&mut self, line: &str) -> Option<Result<String, SummarizeError>> {
        // Blank separators, comments and `event:`/`id:` fields carry no content
        let data = line.strip_prefix("data:")?.trim_start();
        if data == "[DONE]" {
            self.done = true;
            return None;
        }

        let chunk: Chunk = match serde_json::from_str(data) {
            Ok(chunk) => chunk,
            Err(e) => return Some(Err(SummarizeError::Malformed(format!("{}: {}", e, data)))),
        };
        if let Some(error) = chunk.error {
            return Some(Err(SummarizeError::Api(error.message)));
        }
        chunk
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta.content)
            .filter(|content| !content.is_empty())
            .map(Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contents(results: Vec<Result<String, SummarizeError>>) -> Vec<String> {
        results.into_iter().map(|r| r.unwrap()).collect()
    }

    #[test]
    fn decodes_deltas_split_across_chunks() {
        let mut decoder = SseDecoder::default();
        let first = decoder.feed(b"data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\ndata: {\"choi");
        assert!(first.is_empty());
        let second = decoder.feed(b"ces\":[{\"delta\":{\"content\":\"Hello\"}}]}\n\n");
        assert_eq!(contents(second), vec!["Hello"]);
        let third = decoder.feed(b"data: {\"choices\":[{\"delta\":{\"content\":\" world\"}}]}\r\n\r\n");
        assert_eq!(contents(third), vec![" world"]);
    }

    #[test]
    fn stops_at_done() {
        let mut decoder = SseDecoder::default();
        let out = decoder.feed(
            b"data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n\ndata: [DONE]\n\ndata: {\"choices\":[{\"delta\":{\"content\":\"b\"}}]}\n",
        );
        assert_eq!(contents(out), vec!["a"]);
        assert!(decoder.is_done());
        assert!(decoder.feed(b"data: {\"choices\":[]}\n").is_empty());
    }

    #[test]
    fn keeps_multibyte_characters_split_between_chunks() {
        let line = "data: {\"choices\":[{\"delta\":{\"content\":\"摘要\"}}]}\n".as_bytes();
        let split = line.iter().position(|&b| b >= 0x80).unwrap() + 1;
        let mut decoder = SseDecoder::default();
        assert!(decoder.feed(&line[..split]).is_empty());
        assert_eq!(contents(decoder.feed(&line[split..])), vec!["摘要"]);
    }

    #[test]
    fn finish_decodes_unterminated_last_line() {
        let mut decoder = SseDecoder::default();
        let out = decoder.feed(b"data: {\"choices\":[{\"delta\":{\"content\":\"last\"}}]}");
        assert!(out.is_empty());
        assert_eq!(contents(decoder.finish()), vec!["last"]);
        assert!(decoder.finish().is_empty());
    }

    #[test]
    fn finish_ignores_leftovers_after_done() {
        let mut decoder = SseDecoder::default();
        decoder.feed(b"data: [DONE]\n");
        decoder.feed(b"data: {\"choices\":[{\"delta\":{\"content\":\"late\"}}]}");
        assert!(decoder.finish().is_empty());
    }

    #[test]
    fn finish_on_blank_tail_yields_nothing() {
        let mut decoder = SseDecoder::default();
        decoder.feed(b"data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n\r");
        assert!(decoder.finish().is_empty());
    }

    #[test]
    fn null_content_and_comments_are_skipped() {
        let mut decoder = SseDecoder::default();
        let out = decoder.feed(
            b": keep-alive\nevent: message\ndata: {\"choices\":[{\"delta\":{\"content\":null},\"finish_reason\":\"stop\"}]}\n",
        );
        assert!(out.is_empty());
    }

    #[test]
    fn error_payload_becomes_api_error() {
        let mut decoder = SseDecoder::default();
        let out = decoder.feed(b"data: {\"error\":{\"message\":\"quota exceeded\"}}\n");
        assert!(matches!(&out[..], [Err(SummarizeError::Api(m))] if m == "quota exceeded"));
    }

    #[test]
    fn malformed_json_is_reported() {
        let mut decoder = SseDecoder::default();
        let out = decoder.feed(b"data: {not json\n");
        assert!(matches!(&out[..], [Err(SummarizeError::Malformed(_))]));
    }
}
