/*
 * Copyright 2026 sukawasatoru
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

use std::io::{ErrorKind, Read};

/// Pull-based stream of decoded text chunks over a chunked response body.
///
/// Each `next()` suspends on the underlying reader and yields the text that
/// arrived, so the caller can render partial replies between pulls. A UTF-8
/// sequence split across two reads is carried over to the next chunk;
/// invalid bytes decode to U+FFFD.
pub struct ReplyStream {
    reader: Box<dyn Read>,
    pending: Vec<u8>,
    done: bool,
}

impl ReplyStream {
    pub fn new(reader: Box<dyn Read>) -> Self {
        Self {
            reader,
            pending: Vec::new(),
            done: false,
        }
    }

    /// Decode everything in `pending` except an incomplete trailing
    /// sequence; at EOF the truncated tail decodes to U+FFFD instead.
    fn decode_pending(&mut self, eof: bool) -> String {
        let tail = if eof {
            0
        } else {
            incomplete_tail_len(&self.pending)
        };
        let cut = self.pending.len() - tail;

        let decoded = String::from_utf8_lossy(&self.pending[..cut]).into_owned();
        self.pending.drain(..cut);
        decoded
    }
}

impl Iterator for ReplyStream {
    type Item = std::io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let mut buf = [0u8; 4096];
        loop {
            match self.reader.read(&mut buf) {
                Ok(0) => {
                    self.done = true;
                    if self.pending.is_empty() {
                        return None;
                    }
                    return Some(Ok(self.decode_pending(true)));
                }
                Ok(read_count) => {
                    self.pending.extend_from_slice(&buf[..read_count]);
                    let decoded = self.decode_pending(false);
                    if !decoded.is_empty() {
                        return Some(Ok(decoded));
                    }
                    // only a partial sequence arrived; wait for more bytes.
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

fn utf8_sequence_len(first_byte: u8) -> usize {
    match first_byte {
        0x00..=0x7F => 1,
        0xC0..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF7 => 4,
        // continuation or invalid byte; not a sequence start.
        _ => 0,
    }
}

/// Length of an incomplete UTF-8 sequence at the end of `bytes`, 0 if the
/// buffer ends on a boundary. A truncated sequence is at most 3 bytes, so
/// only the tail needs inspection.
fn incomplete_tail_len(bytes: &[u8]) -> usize {
    for back in 1..=bytes.len().min(3) {
        let index = bytes.len() - back;
        let width = utf8_sequence_len(bytes[index]);
        if width == 0 {
            continue;
        }
        return if width > back { back } else { 0 };
    }

    0
}

#[cfg(test)]
pub(crate) use tests::chunked_reply;
