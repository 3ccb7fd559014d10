//! End-to-end build against a synthetic MicroPython template.

use std::path::Path;

use gbampy_core::{GbaError, ProjectConfig, Result};
use gbampy_runtime::rom::layout::{
    CLOSE_TAG, HEADER_LEN, OPEN_TAG, UNFORMATTED_BLOCK_COUNT, UNFORMATTED_BLOCK_SIZE,
};
use gbampy_runtime::{build, Container, HookRegistry};
use tempfile::TempDir;

const CAPACITY: usize = 4096;
const REGION_OFFSET: usize = 1024;

fn template() -> Vec<u8> {
    let mut rom: Vec<u8> = (0..REGION_OFFSET).map(|i| (i * 7 % 256) as u8).collect();
    rom.extend_from_slice(&OPEN_TAG);
    rom.extend_from_slice(&UNFORMATTED_BLOCK_SIZE.to_le_bytes());
    rom.extend_from_slice(&UNFORMATTED_BLOCK_COUNT.to_le_bytes());
    rom.extend_from_slice(&(CAPACITY as u32).to_le_bytes());
    rom.extend(std::iter::repeat(0u8).take(CAPACITY));
    rom.extend_from_slice(&CLOSE_TAG);
    rom.extend_from_slice(b"trailing code and data");
    rom
}

fn compile(source: &Path) -> Result<Vec<u8>> {
    let mut compiled = b"M\x06\x00\x1f".to_vec();
    compiled.extend(std::fs::read(source)?);
    Ok(compiled)
}

fn project(extra_config: &str) -> TempDir {
    let dir = TempDir::new().unwrap();
    let config = format!(
        r#"
[project]
source_dir = "app"
target_dir = "game"

[gba]
template = "micropython.gba"
output = "build/game.gba"
{extra_config}
"#
    );
    std::fs::write(dir.path().join(".gbampy.toml"), config).unwrap();
    std::fs::write(dir.path().join("micropython.gba"), template()).unwrap();
    std::fs::create_dir_all(dir.path().join("app/lib")).unwrap();
    std::fs::create_dir_all(dir.path().join("build")).unwrap();
    std::fs::write(dir.path().join("app/lib/util.py"), "def add(a, b):\n    return a + b\n").unwrap();
    dir
}

fn mount_output(path: &Path) -> Container {
    let mut rom = Container::load(path).unwrap();
    rom.open_filesystem().unwrap();
    rom
}

#[test]
fn test_build_with_compile_enabled() {
    let dir = project("[mpy-cross]\ncompile = true\n");
    let config = ProjectConfig::load(dir.path()).unwrap();

    let result = build(&config, &compile, &HookRegistry::new()).unwrap();
    assert_eq!(result.compiled, 1);
    assert_eq!(result.block_size, 512);
    assert_eq!(result.block_count, 8);

    let original = template();
    let output = std::fs::read(&result.output).unwrap();
    assert_eq!(output.len(), original.len());

    let close = REGION_OFFSET + HEADER_LEN + CAPACITY;
    assert_eq!(&output[close..close + 8], &CLOSE_TAG);
    assert_eq!(&output[..REGION_OFFSET + 8], &original[..REGION_OFFSET + 8]);
    assert_eq!(&output[close..], &original[close..]);

    let mut rom = mount_output(&result.output);
    let image = rom.image_mut().unwrap();
    let compiled = image.read_file("/game/lib/util.mpy").unwrap();
    assert!(compiled.starts_with(b"M\x06"));
    assert!(image.read_file("/game/lib/util.py").is_err());
}

#[test]
fn test_build_with_compile_disabled() {
    let dir = project("");
    let config = ProjectConfig::load(dir.path()).unwrap();

    let never = |_: &Path| -> Result<Vec<u8>> { panic!("compile disabled") };
    let result = build(&config, &never, &HookRegistry::new()).unwrap();
    assert_eq!(result.compiled, 0);

    let mut rom = mount_output(&result.output);
    assert_eq!(
        rom.image_mut().unwrap().read_file("/game/lib/util.py").unwrap(),
        b"def add(a, b):\n    return a + b\n"
    );
}

#[test]
fn test_rebuild_from_built_image_round_trips() {
    let dir = project("");
    let config = ProjectConfig::load(dir.path()).unwrap();
    let result = build(&config, &compile, &HookRegistry::new()).unwrap();

    let copy = dir.path().join("build/copy.gba");
    mount_output(&result.output).save(&copy).unwrap();
    assert_eq!(
        std::fs::read(&result.output).unwrap(),
        std::fs::read(&copy).unwrap()
    );
}

#[test]
fn test_failed_build_writes_nothing() {
    let dir = project("[mpy-cross]\ncompile = true\n");
    let config = ProjectConfig::load(dir.path()).unwrap();
    let failing = |source: &Path| -> Result<Vec<u8>> {
        Err(GbaError::CompileError {
            script: source.to_path_buf(),
            diagnostics: "Traceback: SyntaxError".to_string(),
        })
    };

    let err = build(&config, &failing, &HookRegistry::new()).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("util.py"));
    assert!(message.contains("Traceback: SyntaxError"));
    assert!(!dir.path().join("build/game.gba").exists());
    let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("build")).unwrap().collect();
    assert!(leftovers.is_empty());
}
