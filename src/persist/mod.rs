// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Project and studio files.
//!
//! Files are plain `key = value` lines. `#` comments and blank lines are
//! ignored. An array is a count line followed by its elements:
//!
//! ```text
//! project.tracks = 1
//! project.tracks[0].name = Lead
//! project.tracks[0].device = 0
//! ```
//!
//! Each structure has one [`Describe`] implementation that both the
//! [`Encoder`] and the [`Decoder`] walk, so reading expects exactly the
//! keys writing produced, in the same order. Strings are trimmed on read
//! and may not contain line breaks.

mod schema;

use std::fs;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use tracing::{info, warn};

use crate::index::{
    DeviceIdx, InstrumentIdx, PartIdx, PatternIdx, SettingIdx, SongIdx, TrackIdx,
};
use crate::project::Project;
use crate::studio::Studio;

/// Key prefix of a project file
pub const PROJECT_PREFIX: &str = "project";

/// Key prefix of a studio file
pub const STUDIO_PREFIX: &str = "studio";

/// A value that can be written as one line and read back
pub trait Field {
    /// Text form of the value
    fn write(&self) -> String;
    /// Replace the value from its text form
    fn read(&mut self, text: &str) -> Result<()>;
}

macro_rules! parsed_field {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Field for $ty {
                fn write(&self) -> String {
                    self.to_string()
                }

                fn read(&mut self, text: &str) -> Result<()> {
                    *self = text.parse::<$ty>()?;
                    Ok(())
                }
            }
        )*
    };
}

parsed_field!(
    u8,
    i8,
    u16,
    i16,
    usize,
    TrackIdx,
    PatternIdx,
    PartIdx,
    SongIdx,
    DeviceIdx,
    InstrumentIdx,
    SettingIdx,
);

impl Field for String {
    fn write(&self) -> String {
        self.clone()
    }

    fn read(&mut self, text: &str) -> Result<()> {
        *self = text.to_string();
        Ok(())
    }
}

/// Walks the fields of a structure
pub trait Visitor {
    /// Visit one scalar field
    fn field(&mut self, key: &str, value: &mut dyn Field) -> Result<()>;

    /// Visit an array length. Returns the length the array must have
    /// afterwards: `len` when writing, the stored count when reading.
    fn count(&mut self, key: &str, len: usize, capacity: usize) -> Result<usize>;
}

/// A structure with a fixed field layout
pub trait Describe {
    /// Visit every field under `prefix`, in file order
    fn describe<V: Visitor>(&mut self, v: &mut V, prefix: &str) -> Result<()>;
}

/// `prefix.name`, or just `name` at the top level
pub(crate) fn key(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", prefix, name)
    }
}

/// Visit an array of structures: its count, then each element as
/// `key[i]`
pub(crate) fn describe_all<V: Visitor, T: Describe + Default>(
    v: &mut V,
    key: &str,
    items: &mut Vec<T>,
    capacity: usize,
) -> Result<()> {
    let n = v.count(key, items.len(), capacity)?;
    items.resize_with(n, T::default);
    for (i, item) in items.iter_mut().enumerate() {
        item.describe(v, &format!("{}[{}]", key, i))?;
    }
    Ok(())
}

/// Writes visited fields as text
#[derive(Debug, Default)]
pub struct Encoder {
    out: String,
}

impl Encoder {
    /// Create an empty encoder
    pub fn new() -> Self {
        Self::default()
    }

    /// The encoded text
    pub fn finish(self) -> String {
        self.out
    }

    fn line(&mut self, key: &str, value: &str) -> Result<()> {
        if value.contains(|c: char| c == '\n' || c == '\r') {
            bail!("{}: value contains a line break", key);
        }
        self.out.push_str(key);
        self.out.push_str(" = ");
        self.out.push_str(value);
        self.out.push('\n');
        Ok(())
    }
}

impl Visitor for Encoder {
    fn field(&mut self, key: &str, value: &mut dyn Field) -> Result<()> {
        let text = value.write();
        self.line(key, &text)
    }

    fn count(&mut self, key: &str, len: usize, capacity: usize) -> Result<usize> {
        if len > capacity {
            bail!("{}: {} entries exceed capacity {}", key, len, capacity);
        }
        self.line(key, &len.to_string())?;
        Ok(len)
    }
}

/// Reads visited fields from text, strictly in order
#[derive(Debug)]
pub struct Decoder<'a> {
    lines: Vec<(usize, &'a str, &'a str)>,
    next: usize,
}

impl<'a> Decoder<'a> {
    /// Split text into numbered `key = value` lines
    pub fn new(text: &'a str) -> Result<Self> {
        let mut lines = Vec::new();
        for (i, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (k, value) = line
                .split_once('=')
                .ok_or_else(|| anyhow!("line {}: expected 'key = value'", i + 1))?;
            lines.push((i + 1, k.trim(), value.trim()));
        }
        Ok(Self { lines, next: 0 })
    }

    /// Fail if lines are left over
    pub fn finish(self) -> Result<()> {
        match self.lines.get(self.next) {
            Some((number, k, _)) => bail!("line {}: unexpected key '{}'", number, k),
            None => Ok(()),
        }
    }

    fn take(&mut self, key: &str) -> Result<(usize, &'a str)> {
        let Some(&(number, k, value)) = self.lines.get(self.next) else {
            bail!("unexpected end of file, expected '{}'", key);
        };
        if k != key {
            bail!("line {}: expected '{}', found '{}'", number, key, k);
        }
        self.next += 1;
        Ok((number, value))
    }
}

impl Visitor for Decoder<'_> {
    fn field(&mut self, key: &str, value: &mut dyn Field) -> Result<()> {
        let (number, text) = self.take(key)?;
        value
            .read(text)
            .with_context(|| format!("line {}: bad value for '{}'", number, key))
    }

    fn count(&mut self, key: &str, _len: usize, capacity: usize) -> Result<usize> {
        let (number, text) = self.take(key)?;
        let n: usize = text
            .parse()
            .with_context(|| format!("line {}: bad count for '{}'", number, key))?;
        if n > capacity {
            bail!("line {}: {} entries exceed capacity {}", number, n, capacity);
        }
        Ok(n)
    }
}

/// Encode a structure under a key prefix
pub fn encode<T: Describe + Clone>(value: &T, prefix: &str) -> Result<String> {
    let mut encoder = Encoder::new();
    value.clone().describe(&mut encoder, prefix)?;
    Ok(encoder.finish())
}

/// Decode text into a structure, starting from `value`
pub fn decode<T: Describe>(text: &str, prefix: &str, mut value: T) -> Result<T> {
    let mut decoder = Decoder::new(text)?;
    value.describe(&mut decoder, prefix)?;
    decoder.finish()?;
    Ok(value)
}

/// Load a studio file and check its voice layouts
pub fn load_studio(path: &Path) -> Result<Studio> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read studio: {}", path.display()))?;
    let studio = decode(&text, STUDIO_PREFIX, Studio::new(""))
        .with_context(|| format!("Failed to parse studio: {}", path.display()))?;
    studio.validate()?;
    info!("Loaded studio '{}' from {}", studio.name, path.display());
    Ok(studio)
}

/// Save a studio file
pub fn save_studio(studio: &Studio, path: &Path) -> Result<()> {
    write_file(path, &encode(studio, STUDIO_PREFIX)?)
}

/// Load a project file and check it against the studio
pub fn load_project(path: &Path, studio: &Studio) -> Result<Project> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read project: {}", path.display()))?;
    let mut project = decode(&text, PROJECT_PREFIX, Project::new(""))
        .with_context(|| format!("Failed to parse project: {}", path.display()))?;
    project.set_quantization(project.quantization());
    project
        .validate(studio)
        .with_context(|| format!("Project does not match the studio: {}", path.display()))?;
    project.filename = Some(path.to_path_buf());
    info!("Loaded project '{}' from {}", project.name, path.display());
    Ok(project)
}

/// Save a project, remember its file name and clear its changed flag
pub fn save_project(project: &mut Project, path: &Path) -> Result<()> {
    write_file(path, &encode(project, PROJECT_PREFIX)?)?;
    project.filename = Some(path.to_path_buf());
    project.clear_changed();
    info!("Saved project '{}' to {}", project.name, path.display());
    Ok(())
}

fn write_file(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(path, text).with_context(|| format!("Failed to write {}", path.display()))
}

fn prompt<R: BufRead, W: Write>(input: &mut R, output: &mut W, question: &str) -> Result<String> {
    write!(output, "{}", question)?;
    output.flush()?;
    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(answer.trim().to_string())
}

/// Offer to save a changed project before exit.
///
/// A project with a file name is saved back to it. Otherwise the user is
/// asked for a name; naming an existing file asks before overwriting it,
/// and a refusal asks for another name. An empty answer skips saving.
/// Returns the path written, if any.
pub fn save_interactive<R: BufRead, W: Write>(
    project: &mut Project,
    input: &mut R,
    output: &mut W,
) -> Result<Option<PathBuf>> {
    if !project.is_changed() {
        return Ok(None);
    }

    if let Some(path) = project.filename.clone() {
        save_project(project, &path)?;
        return Ok(Some(path));
    }

    loop {
        let answer = prompt(input, output, "Save project as (empty to discard): ")?;
        if answer.is_empty() {
            warn!("Project '{}' discarded without saving", project.name);
            return Ok(None);
        }
        let path = PathBuf::from(answer);
        if path.exists() {
            let confirm = prompt(input, output, &format!("{} exists. Overwrite? [y/N] ", path.display()))?;
            if !confirm.eq_ignore_ascii_case("y") {
                continue;
            }
        }
        save_project(project, &path)?;
        return Ok(Some(path));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    use crate::index::{NoteSlot, RowIdx};
    use crate::project::Note;
    use crate::studio::{Device, Instrument, Setting};

    use tempfile::tempdir;

    fn changed_project(studio: &Studio) -> Project {
        let mut project = Project::with_rows(studio, 4).unwrap();
        project.patterns[0]
            .row_mut(RowIdx::new(2).unwrap())
            .unwrap()
            .track_mut(TrackIdx::ZERO)
            .unwrap()
            .set_note(NoteSlot::new(1).unwrap(), Note::new(64, 90))
            .unwrap();
        project.mark_changed();
        project
    }

    #[test]
    fn test_encode_layout() {
        let studio = Studio::default();
        let text = encode(&Project::with_rows(&studio, 2).unwrap(), PROJECT_PREFIX).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "project.name = Untitled");
        assert_eq!(lines[1], "project.tempo = 120");
        assert!(lines.contains(&"project.tracks = 1"));
        assert!(lines.contains(&"project.tracks[0].name = Track 1"));
        assert!(lines.contains(&"project.patterns[0].rows = 2"));
        assert!(lines.contains(&"project.patterns[0].rows[1].tracks[0].notes[1].velocity = 0"));
    }

    #[test]
    fn test_project_round_trip() {
        let studio = Studio::default();
        let mut project = changed_project(&studio);
        project.name = "  padded name ".to_string();

        let text = encode(&project, PROJECT_PREFIX).unwrap();
        let decoded = decode(&text, PROJECT_PREFIX, Project::new("")).unwrap();
        decoded.validate(&studio).unwrap();

        assert_eq!(decoded.name, "padded name");
        assert_eq!(decoded.patterns, project.patterns);
        assert_eq!(decoded.tracks, project.tracks);
        assert!(!decoded.is_changed());
    }

    #[test]
    fn test_studio_round_trip() {
        let studio = Studio::new("Rack").with_device(
            Device::new("Synth", 3).with_instrument(
                Instrument::new("Pad", 4, 3)
                    .with_setting(Setting::new("Warm", 5))
                    .with_setting(Setting::new("Cold", 6)),
            ),
        );
        let text = encode(&studio, STUDIO_PREFIX).unwrap();
        assert!(text.contains("studio.devices[0].instruments[0].settings[1].program = 6"));
        let decoded = decode(&text, STUDIO_PREFIX, Studio::new("")).unwrap();
        assert_eq!(decoded, studio);
    }

    #[test]
    fn test_decode_rejects_out_of_order_keys() {
        let text = "studio.devices = 0\nstudio.name = Rack\n";
        let err = decode(text, STUDIO_PREFIX, Studio::new("")).unwrap_err();
        assert!(err.to_string().contains("line 1"));
        assert!(err.to_string().contains("studio.name"));
    }

    #[test]
    fn test_decode_errors() {
        // Comments and blank lines are skipped
        let ok = "# rack\n\nstudio.name = Rack\nstudio.devices = 0\n";
        assert_eq!(decode(ok, STUDIO_PREFIX, Studio::new("")).unwrap().name, "Rack");

        let missing = "studio.name = Rack\n";
        assert!(decode(missing, STUDIO_PREFIX, Studio::new("")).is_err());

        let trailing = "studio.name = Rack\nstudio.devices = 0\nstudio.extra = 1\n";
        let err = decode(trailing, STUDIO_PREFIX, Studio::new("")).unwrap_err();
        assert!(err.to_string().contains("line 3"));

        let no_equals = "studio.name Rack\n";
        assert!(decode(no_equals, STUDIO_PREFIX, Studio::new("")).is_err());

        let bad_count = "studio.name = Rack\nstudio.devices = 999\n";
        assert!(decode(bad_count, STUDIO_PREFIX, Studio::new("")).is_err());
    }

    #[test]
    fn test_encode_rejects_line_breaks() {
        let studio = Studio::new("two\nlines");
        assert!(encode(&studio, STUDIO_PREFIX).is_err());
    }

    #[test]
    fn test_save_and_load_project() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("songs").join("demo.trak");
        let studio = Studio::default();
        let mut project = changed_project(&studio);

        save_project(&mut project, &path).unwrap();
        assert!(!project.is_changed());
        assert_eq!(project.filename.as_deref(), Some(path.as_path()));

        let loaded = load_project(&path, &studio).unwrap();
        assert_eq!(loaded.patterns, project.patterns);
        assert_eq!(loaded.filename.as_deref(), Some(path.as_path()));
    }

    #[test]
    fn test_load_project_against_wrong_studio() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("demo.trak");
        let studio = Studio::default();
        let mut project = changed_project(&studio);
        save_project(&mut project, &path).unwrap();

        let mono = Studio::new("Mono")
            .with_device(Device::new("Lead", 0).with_instrument(Instrument::new("Mono", 1, 0)));
        assert!(load_project(&path, &mono).is_err());
        assert!(load_project(&dir.path().join("missing.trak"), &studio).is_err());
    }

    #[test]
    fn test_save_and_load_studio() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("studio.txt");
        save_studio(&Studio::default(), &path).unwrap();
        assert_eq!(load_studio(&path).unwrap(), Studio::default());

        let bad = Studio::new("Bad")
            .with_device(Device::new("X", 0).with_instrument(Instrument::new("Zero", 0, 0)));
        save_studio(&bad, &path).unwrap();
        assert!(load_studio(&path).is_err());
    }

    #[test]
    fn test_load_studio_rejects_channel_out_of_range() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("studio.txt");
        let mut studio = Studio::default();
        studio.devices[1].channel = 16;
        save_studio(&studio, &path).unwrap();

        let err = load_studio(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("channel"));

        studio.devices[1].channel = 15;
        save_studio(&studio, &path).unwrap();
        assert_eq!(load_studio(&path).unwrap().devices[1].channel, 15);
    }

    #[test]
    fn test_save_interactive_unchanged_does_nothing() {
        let studio = Studio::default();
        let mut project = Project::new_default(&studio).unwrap();
        let mut output = Vec::new();
        let saved = save_interactive(&mut project, &mut Cursor::new(""), &mut output).unwrap();
        assert_eq!(saved, None);
        assert!(output.is_empty());
    }

    #[test]
    fn test_save_interactive_empty_answer_skips() {
        let studio = Studio::default();
        let mut project = changed_project(&studio);
        let mut output = Vec::new();
        let saved = save_interactive(&mut project, &mut Cursor::new("\n"), &mut output).unwrap();
        assert_eq!(saved, None);
        assert!(project.is_changed());
    }

    #[test]
    fn test_save_interactive_reprompts_on_refused_overwrite() {
        let dir = tempdir().unwrap();
        let existing = dir.path().join("taken.trak");
        fs::write(&existing, "keep me").unwrap();
        let fresh = dir.path().join("fresh.trak");

        let studio = Studio::default();
        let mut project = changed_project(&studio);
        let answers = format!("{}\nn\n{}\n", existing.display(), fresh.display());
        let mut output = Vec::new();
        let saved = save_interactive(&mut project, &mut Cursor::new(answers), &mut output).unwrap();

        assert_eq!(saved.as_deref(), Some(fresh.as_path()));
        assert_eq!(fs::read_to_string(&existing).unwrap(), "keep me");
        assert!(fresh.exists());
        assert!(String::from_utf8(output).unwrap().contains("Overwrite?"));
    }

    #[test]
    fn test_save_interactive_uses_existing_filename() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("own.trak");
        let studio = Studio::default();
        let mut project = changed_project(&studio);
        project.filename = Some(path.clone());

        let mut output = Vec::new();
        let saved = save_interactive(&mut project, &mut Cursor::new(""), &mut output).unwrap();
        assert_eq!(saved, Some(path.clone()));
        assert!(output.is_empty());
        assert!(!project.is_changed());
    }
}
