use std::fmt::Write as _;
use std::path::Path;
use tokio::fs;
use tracing::info;

use crate::config::SubtitleConfig;
use crate::error::{DublineError, Result};
use crate::segment::Segment;

const UTF8_BOM: &str = "\u{feff}";

/// Generate an ASS subtitle file from translated segments
pub async fn write_ass<P: AsRef<Path>>(
    segments: &[Segment],
    config: &SubtitleConfig,
    output_path: P,
) -> Result<()> {
    let output_path = output_path.as_ref();
    info!("Generating ASS file: {}", output_path.display());

    let content = format!("{}{}", UTF8_BOM, render_ass(segments, config)?);
    fs::write(output_path, content).await?;

    info!("ASS file generated with {} dialogue lines", segments.len());
    Ok(())
}

/// Render the whole script: white text on a semi-transparent black box.
pub fn render_ass(segments: &[Segment], config: &SubtitleConfig) -> Result<String> {
    let mut out = String::new();
    render_into(&mut out, segments, config)
        .map_err(|e| DublineError::Subtitle(format!("failed to render subtitles: {}", e)))?;
    Ok(out)
}

fn render_into(out: &mut String, segments: &[Segment], config: &SubtitleConfig) -> std::fmt::Result {
    writeln!(out, "[Script Info]")?;
    writeln!(out, "ScriptType: v4.00+")?;
    writeln!(out)?;

    writeln!(out, "[V4+ Styles]")?;
    writeln!(
        out,
        "Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, BackColour, \
         Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, BorderStyle, Outline, \
         Shadow, Alignment, MarginL, MarginR, MarginV, Encoding"
    )?;
    writeln!(
        out,
        "Style: Default,{},{},&H00FFFFFF,&H000000FF,&H80000000,&H80000000,-1,0,0,0,100,100,0,0,1,3,3,2,10,10,10,1",
        config.font_name, config.font_size
    )?;
    writeln!(out)?;

    writeln!(out, "[Events]")?;
    writeln!(out, "Format: Layer, Start, End, Style, Text")?;
    for segment in segments {
        writeln!(
            out,
            "Dialogue: 0,{},{},Default,{}",
            format_ass_time(segment.start),
            format_ass_time(segment.end),
            escape_text(&segment.translated_text)
        )?;
    }
    Ok(())
}

/// Format seconds as HH:MM:SS.mmm, milliseconds truncated
pub fn format_ass_time(seconds: f64) -> String {
    let total_milliseconds = (seconds.max(0.0) * 1000.0) as u64;
    let hours = total_milliseconds / 3_600_000;
    let minutes = (total_milliseconds % 3_600_000) / 60_000;
    let secs = (total_milliseconds % 60_000) / 1_000;
    let millis = total_milliseconds % 1_000;

    format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, secs, millis)
}

/// Trim and turn embedded newlines into ASS hard line breaks.
pub fn escape_text(text: &str) -> String {
    text.trim().replace("\r\n", "\n").replace('\n', "\\N")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn translated(start: f64, end: f64, text: &str) -> Segment {
        Segment::new(start, end, "source").with_translation(text)
    }

    #[test]
    fn test_format_ass_time() {
        assert_eq!(format_ass_time(0.0), "00:00:00.000");
        assert_eq!(format_ass_time(75.6789), "00:01:15.678");
        assert_eq!(format_ass_time(3661.5), "01:01:01.500");
        assert_eq!(format_ass_time(5.9999), "00:00:05.999");
    }

    #[test]
    fn test_escape_text() {
        assert_eq!(escape_text("  line one\nline two \n"), "line one\\Nline two");
        assert_eq!(escape_text("a\r\nb"), "a\\Nb");
    }

    #[test]
    fn test_one_dialogue_line_per_segment_in_order() {
        let segments = vec![
            translated(0.0, 2.0, "नमस्ते"),
            translated(2.0, 5.0, "दुनिया"),
            translated(5.0, 5.5, "!"),
        ];
        let script = render_ass(&segments, &SubtitleConfig::default()).unwrap();

        let dialogue: Vec<&str> = script.lines().filter(|l| l.starts_with("Dialogue:")).collect();
        assert_eq!(
            dialogue,
            vec![
                "Dialogue: 0,00:00:00.000,00:00:02.000,Default,नमस्ते",
                "Dialogue: 0,00:00:02.000,00:00:05.000,Default,दुनिया",
                "Dialogue: 0,00:00:05.000,00:00:05.500,Default,!",
            ]
        );
        assert!(script.starts_with("[Script Info]\nScriptType: v4.00+\n"));
        assert!(script.contains("Style: Default,Arial,20,&H00FFFFFF"));
    }

    #[tokio::test]
    async fn test_write_ass_adds_bom() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("subtitles.ass");
        write_ass(&[translated(1.0, 2.0, "hi")], &SubtitleConfig::default(), &path)
            .await
            .unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..3], &[0xEF, 0xBB, 0xBF]);
        let text = String::from_utf8(bytes[3..].to_vec()).unwrap();
        assert_eq!(text.lines().filter(|l| l.starts_with("Dialogue:")).count(), 1);
    }
}
