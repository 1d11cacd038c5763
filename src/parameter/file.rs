//! File path generators for sample based instruments. Missing files do not fail: they
//! produce an empty path, which textures render as silence.

use std::path::{Path, PathBuf};

use crate::{
    parameter::{ArgType, Arguments, Entry, Generator, Parameter, ReferenceState, Value},
    seed::RandomStream,
    selector::Selector,
};

// -------------------------------------------------------------------------------------------------

pub(crate) static GENERATORS: &[Entry<Box<dyn Generator>>] = &[
    Entry {
        short: "cf",
        long: "constantFile",
        args: &[("absoluteFilePath", ArgType::Text)],
        defaults: "\"\"",
        build: ConstantFile::build,
    },
    Entry {
        short: "ds",
        long: "directorySelect",
        args: &[
            ("directoryFilePath", ArgType::Text),
            ("fileExtension", ArgType::Text),
            ("selection", ArgType::Text),
        ],
        defaults: "., aif, rw",
        build: DirectorySelect::build,
    },
];

/// Quote a path for score output.
fn quoted(path: &str) -> Value {
    Value::Text(format!("\"{}\"", path))
}

/// True for an empty, possibly quoted, path value as produced for missing files.
pub fn is_empty_path(value: &Value) -> bool {
    match value {
        Value::Text(text) => text.trim().trim_matches('"').is_empty(),
        Value::Number(_) => false,
    }
}

/// All files below `dir` with the given extension, sorted.
pub fn find_files(dir: &Path, extension: &str) -> std::io::Result<Vec<PathBuf>> {
    let extension = extension.trim_start_matches('.').to_ascii_lowercase();
    let mut files = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.is_dir() {
                pending.push(path);
            } else if path
                .extension()
                .is_some_and(|ext| ext.to_string_lossy().to_ascii_lowercase() == extension)
            {
                files.push(path);
            }
        }
    }
    files.sort();
    Ok(files)
}

// -------------------------------------------------------------------------------------------------

#[derive(Debug)]
struct ConstantFile {
    path: String,
}

impl ConstantFile {
    fn build(args: &mut Arguments) -> Result<Box<dyn Generator>, String> {
        let path = args.text(0)?.trim().to_string();
        if !Path::new(&path).exists() {
            log::warn!("constantFile: file '{}' does not exist; using silence", path);
            return Ok(Box::new(Self {
                path: String::new(),
            }));
        }
        Ok(Box::new(Self { path }))
    }
}

impl Parameter for ConstantFile {
    fn reset(&mut self) {}
}

impl Generator for ConstantFile {
    fn run(&mut self, _t: f64, _refs: &ReferenceState) -> Result<Value, String> {
        Ok(quoted(&self.path))
    }
}

// -------------------------------------------------------------------------------------------------

/// Selects among the files of a directory with a given extension.
#[derive(Debug)]
struct DirectorySelect {
    selector: Selector<String>,
    rand: RandomStream,
}

impl DirectorySelect {
    fn build(args: &mut Arguments) -> Result<Box<dyn Generator>, String> {
        let dir = args.text(0)?;
        let extension = args.text(1)?;
        let mode = args.selection(2)?;
        let files = match find_files(Path::new(&dir), &extension) {
            Ok(files) => files,
            Err(err) => {
                log::warn!("directorySelect: cannot read directory '{}': {}", dir, err);
                Vec::new()
            }
        };
        if files.is_empty() {
            log::warn!(
                "directorySelect: no '{}' files found in '{}'; using silence",
                extension,
                dir
            );
        }
        let files = files
            .into_iter()
            .map(|path| path.to_string_lossy().to_string())
            .collect();
        Ok(Box::new(Self {
            selector: Selector::new(files, mode),
            rand: args.random(),
        }))
    }
}

impl Parameter for DirectorySelect {
    fn reset(&mut self) {
        self.selector.reset();
        self.rand.reset();
    }

    fn preview(&self) -> Option<String> {
        Some(format!("{} files found", self.selector.len()))
    }
}

impl Generator for DirectorySelect {
    fn run(&mut self, _t: f64, _refs: &ReferenceState) -> Result<Value, String> {
        if self.selector.is_empty() {
            return Ok(quoted(""));
        }
        Ok(quoted(&self.selector.select(&mut self.rand)?))
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    use crate::{
        parameter::{Argument, GeneratorObject, ReprFormat},
        seed::SeedSource,
    };

    fn generator(text: &str) -> Result<GeneratorObject, String> {
        GeneratorObject::build(&Argument::parse(text)?, &mut SeedSource::new(1))
    }

    #[test]
    fn constant_file() -> Result<(), String> {
        let refs = ReferenceState::default();
        let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
        let path = dir.path().join("a.aif");
        std::fs::write(&path, b"").map_err(|err| err.to_string())?;
        let path = path.to_string_lossy().to_string();

        let mut file = generator(&format!("cf, \"{}\"", path))?;
        assert_eq!(file.run(0.0, &refs)?, Value::Text(format!("\"{}\"", path)));
        let mut missing = generator("cf, /no/such/file.aif")?;
        let value = missing.run(0.0, &refs)?;
        assert!(is_empty_path(&value));
        assert!(is_empty_path(&generator("cf")?.run(0.0, &refs)?));
        assert!(!is_empty_path(&Value::Number(0.0)));
        Ok(())
    }

    #[test]
    fn directory_select() -> Result<(), String> {
        let refs = ReferenceState::default();
        let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
        for name in ["b.aif", "a.AIF", "c.wav"] {
            std::fs::write(dir.path().join(name), b"").map_err(|err| err.to_string())?;
        }
        let dir_name = dir.path().to_string_lossy().to_string();
        let mut select = generator(&format!("ds, \"{}\", .aif, oc", dir_name))?;
        assert_eq!(
            select.repr(ReprFormat::Full).lines().last(),
            Some("2 files found")
        );
        let names = (0..3)
            .map(|t| select.run(t as f64, &refs))
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .map(|value| value.to_string())
            .collect::<Vec<_>>();
        assert!(names[0].ends_with("a.AIF\""));
        assert!(names[1].ends_with("b.aif\""));
        assert_eq!(names[0], names[2]);

        let mut missing = generator("ds, /no/such/dir, aif, oc")?;
        assert!(is_empty_path(&missing.run(0.0, &refs)?));
        Ok(())
    }
}
