//! Output writers for [`EventList`]s.

use std::{
    fmt::Debug,
    fs::File,
    io::{BufWriter, Write as _},
    path::{Path, PathBuf},
};

use anyhow::Context;

use crate::{
    error::Error,
    event_list::{EventList, EventMode, MappedEvent, OutputFormat},
    parameter::{args::format_number, Value},
};

// -------------------------------------------------------------------------------------------------

/// Interface for a writer of a single [`OutputFormat`].
pub trait Writer: Debug {
    /// The format this writer produces.
    fn format(&self) -> OutputFormat;

    /// Write the event list into the given output.
    fn write(&self, list: &EventList, output: &mut dyn std::io::Write) -> anyhow::Result<()>;
}

/// Writers available in this crate. `document` is the serialized session, written by
/// the [`OutputFormat::XmlAthenaObject`] writer.
pub fn default_writers(document: String) -> Vec<Box<dyn Writer>> {
    vec![
        Box::new(TextWriter::new(OutputFormat::TextSpace)),
        Box::new(TextWriter::new(OutputFormat::TextTab)),
        Box::new(CsoundScoreWriter),
        Box::new(DocumentWriter::new(document)),
    ]
}

// -------------------------------------------------------------------------------------------------

/// Rounds to microseconds and prints without trailing zeros.
fn number(value: f64) -> String {
    format_number((value * 1.0e6).round() / 1.0e6)
}

fn aux_value(value: &Value, quote: bool) -> String {
    match value {
        Value::Number(number_value) => number(*number_value),
        Value::Text(text) if quote => format!("\"{}\"", text),
        Value::Text(text) => text.clone(),
    }
}

// -------------------------------------------------------------------------------------------------

/// Columnar dump of all event fields, separated by spaces or tabs.
#[derive(Debug, Clone, Copy)]
pub struct TextWriter {
    format: OutputFormat,
}

impl TextWriter {
    const COLUMNS: [&'static str; 10] = [
        "texture", "clone", "inst", "time", "dur", "sus", "acc", "amp", "pitch", "pan",
    ];

    /// Create a new text writer. Formats other than text-tab separate columns by spaces.
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    fn separator(&self) -> &'static str {
        if self.format == OutputFormat::TextTab {
            "\t"
        } else {
            " "
        }
    }

    fn row(&self, mapped: &MappedEvent) -> String {
        let event = &mapped.event;
        let mut columns = vec![
            event.texture.clone(),
            event.clone.clone().unwrap_or_else(|| "-".to_string()),
            event.inst.to_string(),
            number(event.time),
            number(event.dur),
            number(event.sus),
            number(event.acc),
            number(mapped.amp),
            number(mapped.pitch),
            number(mapped.pan),
        ];
        columns.extend(event.aux.iter().map(|value| aux_value(value, false)));
        columns.join(self.separator())
    }
}

impl Writer for TextWriter {
    fn format(&self) -> OutputFormat {
        self.format
    }

    fn write(&self, list: &EventList, output: &mut dyn std::io::Write) -> anyhow::Result<()> {
        writeln!(output, "{}", Self::COLUMNS.join(self.separator()))?;
        for mapped in list.events() {
            writeln!(output, "{}", self.row(mapped))?;
        }
        Ok(())
    }
}

// -------------------------------------------------------------------------------------------------

/// Csound score: one `i` statement per sounding event.
///
/// External orchestras only receive instrument, time, duration and the aux values; all
/// other orchestras get `i<inst> <time> <dur> <amp> <pch> <pan> <aux...>`. With post
/// mapping enabled the sustain replaces the duration.
#[derive(Debug, Clone, Copy)]
pub struct CsoundScoreWriter;

impl CsoundScoreWriter {
    fn statement(mode: EventMode, mapped: &MappedEvent) -> String {
        let event = &mapped.event;
        let dur = if mapped.post_map { event.sus } else { event.dur };
        let mut fields = vec![
            format!("i{}", event.inst),
            number(event.time),
            number(dur),
        ];
        if mode != EventMode::CsoundExternal {
            fields.push(number(mapped.amp));
            fields.push(number(mapped.pitch));
            fields.push(number(mapped.pan));
        }
        fields.extend(event.aux.iter().map(|value| aux_value(value, true)));
        fields.join(" ")
    }
}

impl Writer for CsoundScoreWriter {
    fn format(&self) -> OutputFormat {
        OutputFormat::CsoundScore
    }

    fn write(&self, list: &EventList, output: &mut dyn std::io::Write) -> anyhow::Result<()> {
        let (start, end) = list.time_range_abs();
        writeln!(
            output,
            "; {} events from {} to {} seconds",
            list.len(),
            number(start),
            number(end)
        )?;
        for mapped in list.events().iter().filter(|mapped| !mapped.is_rest()) {
            writeln!(output, "{}", Self::statement(list.mode(), mapped))?;
        }
        writeln!(output, "e")?;
        Ok(())
    }
}

// -------------------------------------------------------------------------------------------------

/// Writes a prepared session document.
#[derive(Debug, Clone)]
pub struct DocumentWriter {
    document: String,
}

impl DocumentWriter {
    pub fn new(document: String) -> Self {
        Self { document }
    }
}

impl Writer for DocumentWriter {
    fn format(&self) -> OutputFormat {
        OutputFormat::XmlAthenaObject
    }

    fn write(&self, _list: &EventList, output: &mut dyn std::io::Write) -> anyhow::Result<()> {
        output.write_all(self.document.as_bytes())?;
        writeln!(output)?;
        Ok(())
    }
}

// -------------------------------------------------------------------------------------------------

/// Outcome of writing an event list into multiple formats.
#[derive(Debug, Default)]
pub struct WriteReport {
    /// Successfully written files.
    pub written: Vec<(OutputFormat, PathBuf)>,
    /// Formats which could not be written.
    pub failed: Vec<(OutputFormat, Error)>,
}

impl WriteReport {
    pub fn is_ok(&self) -> bool {
        self.failed.is_empty()
    }
}

impl EventList {
    /// Write the event list with the given writer into an in-memory or file output.
    pub fn write(
        &self,
        writer: &dyn Writer,
        output: &mut dyn std::io::Write,
    ) -> anyhow::Result<()> {
        if !self.mode().supports(writer.format()) {
            anyhow::bail!(
                "format {} is not available in event mode {}",
                writer.format(),
                self.mode()
            );
        }
        writer.write(self, output)
    }

    /// Write each format into `<base><suffix>`. A failing format does not stop the
    /// remaining ones: failures are logged and collected in the report.
    pub fn write_files(
        &self,
        base: &Path,
        formats: &[OutputFormat],
        writers: &[Box<dyn Writer>],
    ) -> WriteReport {
        let mut report = WriteReport::default();
        for format in formats {
            match self.write_file(base, *format, writers) {
                Ok(file) => report.written.push((*format, file)),
                Err(err) => {
                    log::warn!("failed to write {}: {}", format, err);
                    report.failed.push((*format, err));
                }
            }
        }
        report
    }

    fn write_file(
        &self,
        base: &Path,
        format: OutputFormat,
        writers: &[Box<dyn Writer>],
    ) -> Result<PathBuf, Error> {
        if !self.mode().supports(format) {
            return Err(Error::OutputFormat(format!(
                "format {} is not available in event mode {}",
                format,
                self.mode()
            )));
        }
        let writer = writers
            .iter()
            .find(|writer| writer.format() == format)
            .ok_or_else(|| {
                Error::OutputFormat(format!("no writer registered for format {}", format))
            })?;
        let mut file_name = base.as_os_str().to_owned();
        file_name.push(format.suffix());
        let file = PathBuf::from(file_name);
        let write = || -> anyhow::Result<()> {
            let mut output = BufWriter::new(
                File::create(&file)
                    .with_context(|| format!("failed to create '{}'", file.display()))?,
            );
            writer
                .write(self, &mut output)
                .with_context(|| format!("failed to write '{}'", file.display()))?;
            output.flush()?;
            Ok(())
        };
        write().map_err(|err| Error::FileIO(format!("{:#}", err)))?;
        Ok(file)
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::{orchestra::Orchestra, path::Path as PitchPath, texture::Texture};

    fn scored(orchestra: Orchestra) -> Result<Texture, Error> {
        let path = PitchPath::from_strings("p", &["c4"]).map_err(Error::PitchSyntax)?;
        let mut texture = Texture::new("a", "lg", "p", orchestra, 0, Default::default())?;
        texture.edit("r", "l, ((1,1,1))")?;
        texture.edit("t", "0, 1")?;
        texture.edit("a", ".5")?;
        texture.score(&path)?;
        Ok(texture)
    }

    fn written(list: &EventList, writer: &dyn Writer) -> String {
        let mut output = Vec::new();
        list.write(writer, &mut output).unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn text() -> Result<(), Error> {
        let texture = scored(Orchestra::GeneralMidi)?;
        let mut list = EventList::new(EventMode::Midi);
        list.push_texture(&texture);
        list.sort();
        let text = written(&list, &TextWriter::new(OutputFormat::TextSpace));
        let lines = text.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "texture clone inst time dur sus acc amp pitch pan");
        assert_eq!(lines[1], "a - 0 0 0.5 0.47 1 64 60 64");
        assert_eq!(lines[2], "a - 0 0.5 0.5 0.47 1 64 60 64");
        let tabs = written(&list, &TextWriter::new(OutputFormat::TextTab));
        assert!(tabs.lines().nth(1).is_some_and(|line| line.contains('\t')));
        Ok(())
    }

    #[test]
    fn csound_score() -> Result<(), Error> {
        let texture = scored(Orchestra::CsoundExternal)?;
        let mut list = EventList::new(EventMode::CsoundExternal);
        list.push_texture(&texture);
        list.sort();
        let score = written(&list, &CsoundScoreWriter);
        let lines = score.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[1], "i0 0 0.47");
        assert_eq!(lines[2], "i0 0.5 0.47");
        assert_eq!(lines[3], "e");
        Ok(())
    }

    #[test]
    fn unsupported_formats() -> Result<(), Error> {
        let texture = scored(Orchestra::GeneralMidi)?;
        let mut list = EventList::new(EventMode::Midi);
        list.push_texture(&texture);
        list.sort();
        let mut output = Vec::new();
        assert!(list.write(&CsoundScoreWriter, &mut output).is_err());

        let dir = tempfile::tempdir().map_err(Error::from)?;
        let base = dir.path().join("score");
        let report = list.write_files(
            &base,
            &[OutputFormat::MidiFile, OutputFormat::TextTab, OutputFormat::CsoundScore],
            &default_writers("{}".to_string()),
        );
        assert_eq!(report.written.len(), 1);
        assert!(report.written[0].1.ends_with("score_tab.txt"));
        assert_eq!(
            report
                .failed
                .iter()
                .map(|(format, err)| (*format, err.kind()))
                .collect::<Vec<_>>(),
            vec![
                (OutputFormat::MidiFile, "OutputFormatError"),
                (OutputFormat::CsoundScore, "OutputFormatError")
            ]
        );
        Ok(())
    }
}
