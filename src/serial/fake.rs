use std::collections::VecDeque;

use crate::{protocol::EncodedFrame, Result};

use super::ByteLink;

/// Scripted link for tests: each read hands out the next chunk.
#[derive(Default)]
pub struct FakeSerialPort {
    script: VecDeque<Result<Vec<u8>>>,
    writes: Vec<Vec<u8>>,
}

impl FakeSerialPort {
    pub fn new(script: Vec<Result<Vec<u8>>>) -> Self {
        Self {
            script: script.into(),
            writes: Vec::new(),
        }
    }

    /// Queue another chunk behind the existing script.
    pub fn push_chunk(&mut self, bytes: impl Into<Vec<u8>>) {
        self.script.push_back(Ok(bytes.into()));
    }

    pub fn writes(&self) -> &[Vec<u8>] {
        &self.writes
    }

    pub fn is_drained(&self) -> bool {
        self.script.is_empty()
    }
}

impl ByteLink for FakeSerialPort {
    fn read_available(&mut self, buf: &mut Vec<u8>, max: usize) -> Result<usize> {
        if max == 0 {
            return Ok(0);
        }
        match self.script.pop_front() {
            Some(Ok(mut chunk)) => {
                if chunk.len() > max {
                    // the rest stays queued, like bytes left in a UART buffer
                    let rest = chunk.split_off(max);
                    self.script.push_front(Ok(rest));
                }
                buf.extend_from_slice(&chunk);
                Ok(chunk.len())
            }
            Some(Err(e)) => Err(e),
            None => Ok(0),
        }
    }

    fn write_frame(&mut self, frame: &EncodedFrame) -> Result<()> {
        self.writes.push(frame.as_bytes().to_vec());
        Ok(())
    }
}
