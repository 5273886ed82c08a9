mod common;

use std::fs::File;
use std::io::BufWriter;

use caviz_core::error::CavizError;
use caviz_core::frame::RenderedFrame;
use caviz_core::io::video::frame_rate;
use caviz_core::io::{
    read_frame, read_mask, read_stack, to_display_rgba8, with_appended_extension, FrameWriter,
    ImageKind, OutputFormat, VideoCodec, VideoSettings,
};
use ndarray::{Array2, Array3};
use tempfile::tempdir;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::{colortype, TiffEncoder};

/// Red at the bottom-left pixel (x = 0, y = 0), blue elsewhere.
fn marker_frame(w: usize, h: usize, index: usize) -> RenderedFrame {
    let mut pixels = Array3::zeros((w, h, 4));
    for x in 0..w {
        for y in 0..h {
            let color = if (x, y) == (0, 0) {
                [1.0, 0.0, 0.0, 1.0]
            } else {
                [0.0, 0.0, 1.0, 1.0]
            };
            for c in 0..4 {
                pixels[[x, y, c]] = color[c];
            }
        }
    }
    RenderedFrame::new(pixels, index)
}

fn write_gray_tiff(path: &std::path::Path, pages: &[Vec<u16>], w: u32, h: u32) {
    let file = BufWriter::new(File::create(path).unwrap());
    let mut encoder = TiffEncoder::new(file).unwrap();
    for page in pages {
        encoder
            .write_image::<colortype::Gray16>(w, h, page)
            .unwrap();
    }
}

// ---------------------------------------------------------------------------
// Display conversion
// ---------------------------------------------------------------------------

#[test]
fn test_display_conversion_puts_origin_bottom_left() {
    let frame = marker_frame(3, 2, 0);
    let bytes = to_display_rgba8(&frame.pixels);
    assert_eq!(bytes.dim(), (2, 3, 4));
    // Bottom row, first column.
    assert_eq!(bytes.slice(ndarray::s![1, 0, ..]).to_vec(), vec![255, 0, 0, 255]);
    assert_eq!(bytes.slice(ndarray::s![0, 0, ..]).to_vec(), vec![0, 0, 255, 255]);
}

#[test]
fn test_appended_extension_keeps_dots() {
    let p = with_appended_extension(std::path::Path::new("out/run.2024"), "png");
    assert_eq!(p, std::path::PathBuf::from("out/run.2024.png"));
}

// ---------------------------------------------------------------------------
// Image writers
// ---------------------------------------------------------------------------

#[test]
fn test_png_still_round_trips_through_reader() {
    let dir = tempdir().unwrap();
    let stem = dir.path().join("still");
    let mut writer = FrameWriter::still(
        OutputFormat::ImageSequence(ImageKind::Png),
        &stem,
        &VideoSettings::default(),
    )
    .unwrap();
    writer.push(marker_frame(4, 3, 0)).unwrap();
    let summary = writer.finish().unwrap();

    let path = dir.path().join("still.png");
    assert_eq!(summary.files, vec![path.clone()]);
    assert_eq!(summary.frames, 1);

    let img = image::open(&path).unwrap().to_rgba8();
    assert_eq!(img.dimensions(), (4, 3));
    assert_eq!(img.get_pixel(0, 2).0, [255, 0, 0, 255]);
    assert_eq!(img.get_pixel(0, 0).0, [0, 0, 255, 255]);

    // The reader flips back: (0, 0) is again the marked pixel, and red is
    // brighter than blue in luma.
    let frame = read_frame(&path).unwrap();
    assert_eq!(frame.dim(), (4, 3));
    assert!(frame[[0, 0]] > frame[[1, 0]]);
    assert_eq!(frame[[1, 0]], frame[[3, 2]]);
}

#[test]
fn test_numbered_sequence_naming() {
    let dir = tempdir().unwrap();
    let stem = dir.path().join("run");
    let mut writer = FrameWriter::create(
        OutputFormat::ImageSequence(ImageKind::Bmp),
        &stem,
        3,
        &VideoSettings::default(),
    )
    .unwrap();
    for i in 0..3 {
        writer.push(marker_frame(2, 2, i)).unwrap();
    }
    let summary = writer.finish().unwrap();
    assert_eq!(summary.frames, 3);
    assert_eq!(summary.format, Some(OutputFormat::ImageSequence(ImageKind::Bmp)));
    for i in 0..3 {
        let expected = stem.join(format!("run_{i:05}.bmp"));
        assert!(expected.exists(), "{}", expected.display());
    }
    // BMP output carries no alpha channel.
    let img = image::open(stem.join("run_00000.bmp")).unwrap();
    assert!(!img.color().has_alpha());
}

#[test]
fn test_single_frame_sequence_is_still_numbered() {
    let dir = tempdir().unwrap();
    let stem = dir.path().join("short");
    let mut writer = FrameWriter::create(
        OutputFormat::ImageSequence(ImageKind::Png),
        &stem,
        1,
        &VideoSettings::default(),
    )
    .unwrap();
    writer.push(marker_frame(2, 2, 0)).unwrap();
    let summary = writer.finish().unwrap();
    assert_eq!(summary.files, vec![stem.join("short_00000.png")]);
    assert!(!dir.path().join("short.png").exists());
}

#[test]
fn test_jpeg_still_is_written() {
    let dir = tempdir().unwrap();
    let stem = dir.path().join("photo");
    let mut writer = FrameWriter::still(
        OutputFormat::ImageSequence(ImageKind::Jpeg),
        &stem,
        &VideoSettings::default(),
    )
    .unwrap();
    writer.push(marker_frame(8, 8, 0)).unwrap();
    let summary = writer.finish().unwrap();
    assert!(summary.files[0].exists());
    assert_eq!(summary.files[0].extension().unwrap(), "jpg");
}

#[test]
fn test_zero_frames_is_rejected() {
    let dir = tempdir().unwrap();
    assert!(matches!(
        FrameWriter::create(
            OutputFormat::TiffStack,
            &dir.path().join("x"),
            0,
            &VideoSettings::default()
        ),
        Err(CavizError::EmptySequence)
    ));
}

// ---------------------------------------------------------------------------
// TIFF stacks
// ---------------------------------------------------------------------------

#[test]
fn test_tiff_stack_writes_one_page_per_frame() {
    let dir = tempdir().unwrap();
    let stem = dir.path().join("stack");
    let mut writer =
        FrameWriter::create(OutputFormat::TiffStack, &stem, 3, &VideoSettings::default()).unwrap();
    for i in 0..3 {
        writer.push(marker_frame(5, 4, i)).unwrap();
    }
    let summary = writer.finish().unwrap();
    let path = dir.path().join("stack.tif");
    assert_eq!(summary.files, vec![path.clone()]);
    assert_eq!(summary.frames, 3);

    let mut decoder = Decoder::new(File::open(&path).unwrap()).unwrap();
    let mut pages = 0;
    loop {
        assert_eq!(decoder.dimensions().unwrap(), (5, 4));
        match decoder.read_image().unwrap() {
            DecodingResult::U8(buf) => {
                assert_eq!(buf.len(), 5 * 4 * 4);
                // Row 3 (bottom), column 0.
                let i = (3 * 5) * 4;
                assert_eq!(&buf[i..i + 4], &[255, 0, 0, 255]);
            }
            _ => panic!("expected 8-bit samples"),
        }
        pages += 1;
        if !decoder.more_images() {
            break;
        }
        decoder.next_image().unwrap();
    }
    assert_eq!(pages, 3);
}

#[test]
fn test_tiff_stack_rejects_mixed_sizes() {
    let dir = tempdir().unwrap();
    let mut writer = FrameWriter::create(
        OutputFormat::TiffStack,
        &dir.path().join("s"),
        2,
        &VideoSettings::default(),
    )
    .unwrap();
    writer.push(marker_frame(4, 4, 0)).unwrap();
    assert!(matches!(
        writer.push(marker_frame(4, 5, 1)),
        Err(CavizError::ShapeMismatch(_))
    ));
}

#[test]
fn test_read_gray_tiff_stack_keeps_native_units() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("rec.tif");
    let (w, h) = (3u32, 2u32);
    let pages: Vec<Vec<u16>> = (0..4)
        .map(|t| (0..w * h).map(|i| (1000 * t + i) as u16).collect())
        .collect();
    write_gray_tiff(&path, &pages, w, h);

    let movie = read_stack(&path).unwrap();
    assert_eq!(movie.data.dim(), (3, 2, 4));
    // Top-left sample of page 2 is the top row, so y = h - 1.
    assert_eq!(movie.data[[0, 1, 2]], 2000.0);
    // Bottom-right sample of page 3.
    assert_eq!(movie.data[[2, 0, 3]], 3005.0);
}

#[test]
fn test_read_mask_selects_positive_pixels() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("mask.png");
    let mut img = image::GrayImage::new(3, 3);
    img.put_pixel(1, 0, image::Luma([200]));
    img.save(&path).unwrap();

    let mask = read_mask(&path).unwrap();
    assert_eq!(mask.iter().filter(|&&v| v).count(), 1);
    // Image row 0 is the top, stored at y = 2.
    assert!(mask[[1, 2]]);
}

#[test]
fn test_read_single_image_as_movie() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("one.png");
    image::GrayImage::from_pixel(4, 2, image::Luma([255]))
        .save(&path)
        .unwrap();
    let movie = read_stack(&path).unwrap();
    assert_eq!(movie.data.dim(), (4, 2, 1));
    assert!(movie.data.iter().all(|&v| v == 255.0));
    let _: Array2<f32> = read_frame(&path).unwrap();
}

#[test]
fn test_sixteen_bit_image_keeps_native_units() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("deep.png");
    let mut img = image::ImageBuffer::<image::Luma<u16>, Vec<u16>>::new(3, 2);
    img.put_pixel(0, 0, image::Luma([40_000]));
    img.put_pixel(2, 1, image::Luma([1_234]));
    img.save(&path).unwrap();

    let frame = read_frame(&path).unwrap();
    assert_eq!(frame.dim(), (3, 2));
    // Image row 0 is the top, stored at y = 1.
    assert_eq!(frame[[0, 1]], 40_000.0);
    assert_eq!(frame[[2, 0]], 1_234.0);
    assert_eq!(frame[[1, 0]], 0.0);

    // Same units as a TIFF page of the same samples.
    let tif = dir.path().join("deep.tif");
    write_gray_tiff(&tif, &[vec![40_000, 0, 0, 0, 0, 1_234]], 3, 2);
    let movie = read_stack(&tif).unwrap();
    assert_eq!(movie.frame(0), frame.view());
}

// ---------------------------------------------------------------------------
// Video
// ---------------------------------------------------------------------------

#[test]
fn test_frame_rate_from_period_and_speed() {
    let settings = VideoSettings {
        sampling_period_ms: 50.0,
        speed_factor: 2.0,
        ..Default::default()
    };
    assert!((frame_rate(&settings).unwrap() - 40.0).abs() < 1e-9);

    for period in [0.0, -10.0, f64::NAN, f64::INFINITY] {
        let s = VideoSettings {
            sampling_period_ms: period,
            ..Default::default()
        };
        assert!(matches!(
            frame_rate(&s),
            Err(CavizError::InvalidSamplingPeriod(_))
        ));
    }
}

#[test]
fn test_output_format_names() {
    assert_eq!(
        OutputFormat::from_name("MP4", "export_format").unwrap(),
        OutputFormat::Video(VideoCodec::Mp4)
    );
    assert_eq!(
        OutputFormat::from_name(".tiff", "export_format").unwrap(),
        OutputFormat::TiffStack
    );
    assert_eq!(
        OutputFormat::from_name("jpeg", "export_format").unwrap(),
        OutputFormat::ImageSequence(ImageKind::Jpeg)
    );
    assert!(matches!(
        OutputFormat::from_name("gif", "export_format"),
        Err(CavizError::UnsupportedCodec(_))
    ));
    assert!(OutputFormat::Video(VideoCodec::Avi).is_video());
    assert_eq!(OutputFormat::Video(VideoCodec::Mov).extension(), "mov");
}
