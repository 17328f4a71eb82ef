//! Argument lists for each ffmpeg invocation.

use std::path::Path;

/// Pixel format forced on re-encoded video
pub const PIXEL_FORMAT: &str = "yuv420p";

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

/// List available encoders.
pub fn probe_args() -> Vec<String> {
    vec!["-hide_banner".to_string(), "-encoders".to_string()]
}

/// Re-encode the first video stream with `encoder`, copying the optional
/// first audio stream, laid out for progressive playback.
pub fn reencode_args(source: &Path, destination: &Path, encoder: &str) -> Vec<String> {
    vec![
        "-y".to_string(),
        "-i".to_string(),
        path_arg(source),
        "-map".to_string(),
        "0:v:0".to_string(),
        "-map".to_string(),
        "0:a?".to_string(),
        "-c:v".to_string(),
        encoder.to_string(),
        "-pix_fmt".to_string(),
        PIXEL_FORMAT.to_string(),
        "-c:a".to_string(),
        "copy".to_string(),
        "-movflags".to_string(),
        "+faststart".to_string(),
        path_arg(destination),
    ]
}

/// Remux every stream unmodified.
pub fn copy_args(source: &Path, destination: &Path) -> Vec<String> {
    vec![
        "-y".to_string(),
        "-i".to_string(),
        path_arg(source),
        "-c".to_string(),
        "copy".to_string(),
        path_arg(destination),
    ]
}

/// Encoder named by a `-c:v` argument, if any
pub fn video_encoder(args: &[String]) -> Option<&str> {
    args.windows(2)
        .find(|w| w[0] == "-c:v")
        .map(|w| w[1].as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reencode_args_shape() {
        let args = reencode_args(Path::new("a.ts"), Path::new("a.mp4"), "libx264");
        assert_eq!(
            args.join(" "),
            "-y -i a.ts -map 0:v:0 -map 0:a? -c:v libx264 -pix_fmt yuv420p -c:a copy \
             -movflags +faststart a.mp4"
        );
        assert_eq!(video_encoder(&args), Some("libx264"));
    }

    #[test]
    fn test_copy_args_shape() {
        let args = copy_args(Path::new("a.ts"), Path::new("a.mp4"));
        assert_eq!(args.join(" "), "-y -i a.ts -c copy a.mp4");
        assert_eq!(video_encoder(&args), None);
    }

    #[test]
    fn test_probe_args() {
        assert_eq!(probe_args(), vec!["-hide_banner", "-encoders"]);
    }
}
