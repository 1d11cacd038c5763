use simplelog::*;

use athenacl::prelude::*;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // init logging
    TermLogger::init(
        log::STATIC_MAX_LEVEL,
        ConfigBuilder::default().build(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )
    .unwrap_or_else(|err| {
        log::error!("init_logger error: {:?}", err);
    });

    let output = std::env::args()
        .nth(1)
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|| std::env::temp_dir().join("athenacl-render"));

    let mut session = Session::new(SessionOptions {
        author: "athenacl render demo".to_string(),
        ..SessionOptions::default()
    });

    // a slowly unfolding path of set classes
    session.path_new("drift", &["3-2", "4-1", "c4,e4,g4", "7-35", "5-31"])?;

    // a melodic line, a dense fill and sustained chords on top
    session.texture_new("melody", "lg", 0)?;
    session.texture_edit("melody", "t", "0, 30", false)?;
    session.texture_edit("melody", "r", "mp, a{4,1,1}b{4,3,1}c{2,1,0}:{a=5|b=3|c=1}", false)?;
    session.texture_edit("melody", "a", "ws, e, 12, 0, .4, .9", false)?;
    session.texture_edit("melody", "f", "ru, -7, 7", false)?;

    session.texture_new("dust", "tf", 12)?;
    session.texture_edit("dust", "t", "4, 26", false)?;
    session.texture_edit("dust", "o", "bg, rc, (0, 12, 24)", false)?;

    session.texture_new("pads", "ha", 48)?;
    session.texture_edit("pads", "t", "0, 30", false)?;
    session.texture_edit("pads", "r", "l, ((1,4,1))", false)?;

    // an echo of the melody, delayed and transposed
    session.clone_new("melody", "echo")?;
    session.clone_edit("melody", "echo", "t", "fa, (c, .75)", false)?;
    session.clone_edit("melody", "echo", "f", "fa, (c, 12)", false)?;

    let report = session.write_event_list(
        &output,
        Some(
            &[
                OutputFormat::TextSpace,
                OutputFormat::TextTab,
                OutputFormat::XmlAthenaObject,
            ][..],
        ),
    )?;
    for (format, file) in &report.written {
        log::info!("wrote {} to '{}'", format, file.display());
    }
    for (format, err) in &report.failed {
        log::warn!("{} failed: {}", format, err);
    }
    Ok(())
}
