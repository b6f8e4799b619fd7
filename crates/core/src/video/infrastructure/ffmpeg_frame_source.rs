use std::path::{Path, PathBuf};

use ffmpeg_next as ffmpeg;
use ffmpeg::format::Pixel;
use ffmpeg::software::scaling;
use ffmpeg::util::frame::video::Video as VideoFrame;

use crate::shared::frame::Frame;
use crate::video::domain::frame_source::FrameSource;

/// Decodes a video file or capture URL via ffmpeg-next, one RGB frame per call.
pub struct FfmpegFrameSource {
    path: PathBuf,
    stream: Option<OpenStream>,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Phase {
    Reading,
    Draining,
    Finished,
}

struct OpenStream {
    input: ffmpeg::format::context::Input,
    decoder: ffmpeg::decoder::Video,
    to_rgb: scaling::Context,
    stream_index: usize,
    next_index: usize,
    phase: Phase,
}

// Safety: the ffmpeg contexts are owned exclusively and only touched
// through `&mut self`, so moving the source to another thread is sound.
unsafe impl Send for FfmpegFrameSource {}

impl FfmpegFrameSource {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            stream: None,
        }
    }
}

impl FrameSource for FfmpegFrameSource {
    fn open(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        ffmpeg::init()?;
        let input = ffmpeg::format::input(&self.path)?;
        let best = input
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or_else(|| format!("{}: no video stream", self.path.display()))?;
        let stream_index = best.index();
        let decoder = ffmpeg::codec::context::Context::from_parameters(best.parameters())?
            .decoder()
            .video()?;

        let (w, h) = (decoder.width(), decoder.height());
        let to_rgb = scaling::Context::get(
            decoder.format(),
            w,
            h,
            Pixel::RGB24,
            w,
            h,
            scaling::Flags::BILINEAR,
        )?;
        log::debug!("Opened {} ({w}x{h})", self.path.display());

        self.stream = Some(OpenStream {
            input,
            decoder,
            to_rgb,
            stream_index,
            next_index: 0,
            phase: Phase::Reading,
        });
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        match self.stream.as_mut() {
            Some(stream) => stream.advance(),
            None => Err(format!("{} is not open", self.path.display()).into()),
        }
    }

    fn close(&mut self) {
        self.stream = None;
    }
}

impl OpenStream {
    fn advance(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        loop {
            if self.phase == Phase::Finished {
                return Ok(None);
            }
            if let Some(frame) = self.receive()? {
                return Ok(Some(frame));
            }
            match self.phase {
                Phase::Reading => self.feed_packet(),
                Phase::Draining | Phase::Finished => self.phase = Phase::Finished,
            }
        }
    }

    /// Sends the next packet of our stream, or EOF when the input ends.
    fn feed_packet(&mut self) {
        for (stream, packet) in self.input.packets() {
            if stream.index() == self.stream_index && self.decoder.send_packet(&packet).is_ok() {
                return;
            }
        }
        let _ = self.decoder.send_eof();
        self.phase = Phase::Draining;
    }

    fn receive(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        let mut decoded = VideoFrame::empty();
        if self.decoder.receive_frame(&mut decoded).is_err() {
            return Ok(None);
        }
        let mut rgb = VideoFrame::empty();
        self.to_rgb.run(&decoded, &mut rgb)?;

        let frame = Frame::new(
            packed_rows(&rgb),
            rgb.width(),
            rgb.height(),
            3,
            self.next_index,
        );
        self.next_index += 1;
        Ok(Some(frame))
    }
}

/// RGB24 plane with line padding removed.
fn packed_rows(rgb: &VideoFrame) -> Vec<u8> {
    let row_bytes = rgb.width() as usize * 3;
    rgb.data(0)
        .chunks(rgb.stride(0))
        .take(rgb.height() as usize)
        .flat_map(|row| &row[..row_bytes])
        .copied()
        .collect()
}
