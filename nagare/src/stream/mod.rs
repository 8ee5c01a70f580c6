use crate::{error::EngineError, generator::result::GenerationResult};

/// Event grammar of one completion call: `Data` zero or more times, then
/// exactly one terminal `End` or `Error`. Partial output already delivered
/// through `Data` is never retracted, even when the call ends in `Error`.
#[derive(Debug)]
pub enum StreamEvent<'a> {
    Data {
        token: &'a str,
        is_final: bool,
    },
    End(&'a GenerationResult),
    Error {
        error: &'a EngineError,
        partial: &'a GenerationResult,
    },
}

/// Ordered single-consumer delivery around the caller's callback. Once a
/// terminal event has been delivered every further emission is dropped, so
/// the grammar above holds even on buggy internal paths. Callbacks must not
/// call back into the engine that is delivering to them.
pub struct StreamEmitter<F> {
    callback: F,
    terminated: bool,
}

impl<F> StreamEmitter<F>
where
    F: FnMut(StreamEvent<'_>),
{
    pub fn new(callback: F) -> Self {
        Self {
            callback,
            terminated: false,
        }
    }

    pub fn data(
        &mut self,
        token: &str,
        is_final: bool,
    ) {
        if self.terminated {
            return;
        }
        (self.callback)(StreamEvent::Data {
            token,
            is_final,
        });
    }

    pub fn end(
        &mut self,
        result: &GenerationResult,
    ) {
        if self.terminated {
            return;
        }
        self.terminated = true;
        (self.callback)(StreamEvent::End(result));
    }

    pub fn error(
        &mut self,
        error: &EngineError,
        partial: &GenerationResult,
    ) {
        if self.terminated {
            return;
        }
        self.terminated = true;
        (self.callback)(StreamEvent::Error {
            error,
            partial,
        });
    }
}
