//! Simulation error types.
//!
//! Phase violations and configuration errors are fatal and surface as
//! [`SimError`] values. Structural problems and modelled hardware races go
//! through the issue channel instead and only become an error when
//! elaboration halts on them.

use std::io;

use sysdom_ir::{EventId, SignalId};

use crate::phase::Phase;

/// Errors raised by the kernel or propagated out of process bodies.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// An operation was attempted in a phase that does not permit it.
    #[error("`{operation}` is not allowed during {phase}")]
    PhaseViolation {
        /// The attempted operation.
        operation: &'static str,
        /// The phase the kernel was in.
        phase: Phase,
    },

    /// `elaborate` was called a second time.
    #[error("elaboration already done")]
    AlreadyElaborated,

    /// A handle was used with a value type other than the one it was created with.
    #[error("{signal} does not carry values of type {expected}")]
    TypeMismatch {
        /// The signal.
        signal: SignalId,
        /// Type requested by the handle.
        expected: &'static str,
    },

    /// A bus value of the wrong width was written.
    #[error("{signal} is {expected} bits wide, got a {actual}-bit value")]
    WidthMismatch {
        /// The signal.
        signal: SignalId,
        /// Declared width.
        expected: u32,
        /// Width of the rejected value.
        actual: u32,
    },

    /// An ID did not belong to this kernel.
    #[error("unknown {kind} {index}")]
    UnknownObject {
        /// Object kind.
        kind: &'static str,
        /// Raw index.
        index: u32,
    },

    /// Two ordinary drivers wrote one signal in the same delta cycle and the
    /// kernel runs with strict drivers.
    #[error("signal {signal} has multiple drivers: {first} and {second}")]
    MultipleDrivers {
        /// Signal path.
        signal: String,
        /// First writer.
        first: String,
        /// Conflicting writer.
        second: String,
    },

    /// A tick wait was requested by a process without sensitivity, or a
    /// predicate was given no sensitivity to guard.
    #[error("tick is only allowed for clocked processes ({process})")]
    NotClocked {
        /// Process path.
        process: String,
    },

    /// A threaded process reached the end of its body with nothing to wait for.
    #[error("busy process {process}: body ended without any sensitivity to suspend on")]
    BusyProcess {
        /// Process path.
        process: String,
    },

    /// Only plain events can be fired directly.
    #[error("{0} is a composite event and cannot be fired directly")]
    NotFireable(EventId),

    /// Elaboration produced error-severity issues.
    #[error("elaboration failed with {errors} error(s)")]
    ElaborationFailed {
        /// Number of error issues.
        errors: usize,
    },

    /// Too many delta cycles at one time step, usually a zero-delay loop.
    #[error("delta cycle limit exceeded at {fs} fs (max {max_deltas} deltas)")]
    DeltaCycleLimit {
        /// Time step where the limit was hit.
        fs: u64,
        /// Configured bound.
        max_deltas: u32,
    },

    /// A scheduled time does not fit in 64 bits of femtoseconds.
    #[error("simulated time overflow")]
    TimeOverflow,

    /// A process declared the simulation failed.
    #[error("process {process} failed: {reason}")]
    Failed {
        /// Process path.
        process: String,
        /// Reason given by the process.
        reason: String,
    },

    /// A component was given parameters it cannot be built with.
    #[error("invalid parameters for {component}: {reason}")]
    InvalidParameters {
        /// Component name.
        component: String,
        /// What is wrong.
        reason: String,
    },

    /// Writing waveform output failed.
    #[error("waveform I/O error: {0}")]
    WaveformIo(#[from] io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_phase_violation() {
        let err = SimError::PhaseViolation {
            operation: "read",
            phase: Phase::Construction,
        };
        assert_eq!(err.to_string(), "`read` is not allowed during construction");
    }

    #[test]
    fn display_width_mismatch() {
        let err = SimError::WidthMismatch {
            signal: SignalId::from_raw(2),
            expected: 8,
            actual: 4,
        };
        assert_eq!(err.to_string(), "signal#2 is 8 bits wide, got a 4-bit value");
    }

    #[test]
    fn display_delta_limit() {
        let err = SimError::DeltaCycleLimit {
            fs: 1_000,
            max_deltas: 10,
        };
        assert_eq!(
            err.to_string(),
            "delta cycle limit exceeded at 1000 fs (max 10 deltas)"
        );
    }

    #[test]
    fn display_not_clocked() {
        let err = SimError::NotClocked {
            process: "top.worker".into(),
        };
        assert_eq!(
            err.to_string(),
            "tick is only allowed for clocked processes (top.worker)"
        );
    }

    #[test]
    fn io_converts() {
        let err: SimError = io::Error::new(io::ErrorKind::Other, "disk").into();
        assert!(err.to_string().starts_with("waveform I/O error"));
    }
}
