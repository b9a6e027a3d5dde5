use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "shadelab",
    author,
    version,
    about = "Live-coding shader sandbox",
    arg_required_else_help = false
)]
pub struct Cli {
    /// Base path of the shader pair; `<BASE>.vert` and `<BASE>.frag` are
    /// compiled at startup and recompiled on the reload key.
    #[arg(value_name = "BASE", default_value = "shaders/first")]
    pub shader: PathBuf,

    /// Window size (e.g. `1280x720`).
    #[arg(
        long,
        value_name = "WIDTHxHEIGHT",
        value_parser = parse_surface_size,
        default_value = "1280x720"
    )]
    pub size: (u32, u32),

    /// Target frame rate; the playback clock's fixed per-frame delta is
    /// derived from this value.
    #[arg(long, value_name = "FPS", value_parser = parse_fps, default_value = "60")]
    pub fps: f32,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_surface_size(value: &str) -> Result<(u32, u32), String> {
    let trimmed = value.trim();
    let (w, h) = trimmed
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("invalid size '{trimmed}'; expected WIDTHxHEIGHT"))?;
    let width = w
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("invalid width in size '{trimmed}'"))?;
    let height = h
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("invalid height in size '{trimmed}'"))?;
    if width == 0 || height == 0 {
        return Err("size dimensions must be greater than zero".to_string());
    }
    Ok((width, height))
}

pub fn parse_fps(value: &str) -> Result<f32, String> {
    let fps: f32 = value
        .trim()
        .parse()
        .map_err(|_| format!("invalid frame rate '{value}'"))?;
    if !fps.is_finite() || fps <= 0.0 {
        return Err(format!("frame rate must be positive, got {fps}"));
    }
    Ok(fps)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_surface_size_variants() {
        assert_eq!(parse_surface_size("1280x720").unwrap(), (1280, 720));
        assert_eq!(parse_surface_size(" 1920 X 1080 ").unwrap(), (1920, 1080));
        assert!(parse_surface_size("1280").is_err());
        assert!(parse_surface_size("0x720").is_err());
        assert!(parse_surface_size("1280x-1").is_err());
    }

    #[test]
    fn parses_fps_and_rejects_nonpositive_values() {
        assert_eq!(parse_fps("60").unwrap(), 60.0);
        assert_eq!(parse_fps("29.97").unwrap(), 29.97);
        assert!(parse_fps("0").is_err());
        assert!(parse_fps("-30").is_err());
        assert!(parse_fps("fast").is_err());
    }

    #[test]
    fn cli_defaults_cover_the_bundled_pair() {
        let cli = Cli::parse_from(["shadelab"]);
        assert_eq!(cli.shader, PathBuf::from("shaders/first"));
        assert_eq!(cli.size, (1280, 720));
        assert_eq!(cli.fps, 60.0);
    }
}
