//! Waveform recording.
//!
//! The kernel hands every committed value change of a bit-representable
//! signal to a [`WaveformRecorder`]. [`VcdRecorder`] writes IEEE 1364 Value
//! Change Dump text, one `$scope` per component.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use sysdom_common::{Logic, LogicVec};
use sysdom_ir::SignalId;

use crate::error::SimError;

/// Sink for signal value changes.
pub trait WaveformRecorder {
    /// Declares a signal inside the current scope.
    fn register_signal(&mut self, id: SignalId, name: &str, width: u32) -> Result<(), SimError>;

    /// Opens a hierarchy level.
    fn begin_scope(&mut self, name: &str) -> Result<(), SimError>;

    /// Closes the innermost hierarchy level.
    fn end_scope(&mut self) -> Result<(), SimError>;

    /// Records a value at `time_fs` femtoseconds.
    fn record_change(&mut self, time_fs: u64, id: SignalId, value: &LogicVec)
        -> Result<(), SimError>;

    /// Flushes buffered output.
    fn finalize(&mut self) -> Result<(), SimError>;
}

/// VCD writer. Identifier codes are printable ASCII starting at `!`.
pub struct VcdRecorder<W: Write> {
    writer: W,
    codes: HashMap<SignalId, (String, u32)>,
    next_code: u32,
    header_written: bool,
    current_time: Option<u64>,
}

impl VcdRecorder<BufWriter<File>> {
    /// Creates (or truncates) a VCD file, creating parent directories.
    pub fn create(path: &Path) -> Result<Self, SimError> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        Ok(Self::new(BufWriter::new(File::create(path)?)))
    }
}

impl<W: Write> VcdRecorder<W> {
    /// Wraps an output stream.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            codes: HashMap::new(),
            next_code: 0,
            header_written: false,
            current_time: None,
        }
    }

    /// Consumes the recorder and returns the output stream.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn ensure_header(&mut self) -> Result<(), SimError> {
        if self.header_written {
            return Ok(());
        }
        self.header_written = true;
        writeln!(self.writer, "$version")?;
        writeln!(self.writer, "  sysdom {}", env!("CARGO_PKG_VERSION"))?;
        writeln!(self.writer, "$end")?;
        writeln!(self.writer, "$timescale")?;
        writeln!(self.writer, "  1fs")?;
        writeln!(self.writer, "$end")?;
        Ok(())
    }

    fn make_id_code(index: u32) -> String {
        let mut code = String::new();
        let mut idx = index;
        loop {
            code.push((b'!' + (idx % 94) as u8) as char);
            idx /= 94;
            if idx == 0 {
                break;
            }
            idx -= 1;
        }
        code
    }

    fn format_value(value: &LogicVec, width: u32) -> String {
        let bit = |l: Logic| match l {
            Logic::Zero => '0',
            Logic::One => '1',
            Logic::X => 'x',
            Logic::Z => 'z',
        };
        if width == 1 {
            return bit(value.get(0)).to_string();
        }
        let mut s = String::with_capacity(width as usize + 1);
        s.push('b');
        s.extend((0..width).rev().map(|i| bit(value.get(i))));
        s
    }
}

impl<W: Write> WaveformRecorder for VcdRecorder<W> {
    fn register_signal(&mut self, id: SignalId, name: &str, width: u32) -> Result<(), SimError> {
        self.ensure_header()?;
        let code = Self::make_id_code(self.next_code);
        self.next_code += 1;
        writeln!(self.writer, "$var wire {width} {code} {name} $end")?;
        self.codes.insert(id, (code, width));
        Ok(())
    }

    fn begin_scope(&mut self, name: &str) -> Result<(), SimError> {
        self.ensure_header()?;
        writeln!(self.writer, "$scope module {name} $end")?;
        Ok(())
    }

    fn end_scope(&mut self) -> Result<(), SimError> {
        writeln!(self.writer, "$upscope $end")?;
        Ok(())
    }

    fn record_change(
        &mut self,
        time_fs: u64,
        id: SignalId,
        value: &LogicVec,
    ) -> Result<(), SimError> {
        self.ensure_header()?;
        if self.current_time != Some(time_fs) {
            if self.current_time.is_none() {
                writeln!(self.writer, "$enddefinitions $end")?;
                writeln!(self.writer, "$dumpvars")?;
            }
            writeln!(self.writer, "#{time_fs}")?;
            self.current_time = Some(time_fs);
        }
        let (code, width) = self.codes.get(&id).ok_or(SimError::UnknownObject {
            kind: "waveform signal",
            index: id.as_raw(),
        })?;
        let text = Self::format_value(value, *width);
        if *width == 1 {
            writeln!(self.writer, "{text}{code}")?;
        } else {
            writeln!(self.writer, "{text} {code}")?;
        }
        Ok(())
    }

    fn finalize(&mut self) -> Result<(), SimError> {
        if self.current_time.is_none() {
            self.ensure_header()?;
            writeln!(self.writer, "$enddefinitions $end")?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
