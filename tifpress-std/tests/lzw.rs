use std::{
	fs::{self, File},
	path::Path,
	sync::{mpsc, Arc, Mutex},
	time::Duration,
};

use image::{DynamicImage, GrayAlphaImage, ImageBuffer, ImageFormat, Luma, LumaA, Rgb, RgbImage, Rgba};
use pretty_assertions::assert_eq;
use tempfile::tempdir;
use tiff::{
	decoder::{ifd::Value, Decoder},
	encoder::{
		colortype::{ColorType, Gray8},
		Rational, TiffEncoder,
	},
	tags::{PhotometricInterpretation, ResolutionUnit, SampleFormat, Tag},
};
use tifpress_sdk::engine::{
	batch::Task,
	event::CompletionEvent,
	runner::{JobRunner, RunnerSettings},
};
use tifpress_std::convert::LzwTiffConverter;

const LZW: u16 = 5;
const ICC_PROFILE: Tag = Tag::Unknown(34675);

fn gradient(width: u32, height: u32) -> RgbImage {
	ImageBuffer::from_fn(width, height, |x, y| Rgb([(x * 7 % 256) as u8, (y * 5 % 256) as u8, ((x + y) % 256) as u8]))
}

fn write_uncompressed(image: &DynamicImage, path: &Path) {
	image.save_with_format(path, ImageFormat::Tiff).unwrap();
}

fn compression_of(path: &Path) -> u16 {
	let mut decoder = Decoder::new(File::open(path).unwrap()).unwrap();
	decoder.get_tag_u32(Tag::Compression).unwrap() as u16
}

fn tag(path: &Path, tag: Tag) -> Option<Value> {
	let mut decoder = Decoder::new(File::open(path).unwrap()).unwrap();
	decoder.find_tag(tag).unwrap()
}

/// Fax-style black and white: a set bit is black.
struct WhiteIsZero1;

impl ColorType for WhiteIsZero1 {
	type Inner = u8;
	const TIFF_VALUE: PhotometricInterpretation = PhotometricInterpretation::WhiteIsZero;
	const BITS_PER_SAMPLE: &'static [u16] = &[1];
	const SAMPLE_FORMAT: &'static [SampleFormat] = &[SampleFormat::Uint];
}

fn write_bilevel(path: &Path, width: u32, height: u32, black: impl Fn(u32, u32) -> bool) {
	let row_bytes = width.div_ceil(8);
	let mut packed = vec![0u8; (row_bytes * height) as usize];
	for y in 0..height {
		for x in 0..width {
			if black(x, y) {
				packed[(y * row_bytes + x / 8) as usize] |= 0x80 >> (x % 8);
			}
		}
	}
	let mut encoder = TiffEncoder::new(File::create(path).unwrap()).unwrap();
	let mut image = encoder.new_image::<WhiteIsZero1>(row_bytes, height).unwrap();
	image.encoder().write_tag(Tag::ImageWidth, width).unwrap();
	image.write_data(&packed).unwrap();
}

#[test]
fn rgb_is_lzw_compressed_and_lossless() {
	let dir = tempdir().unwrap();
	let input = dir.path().join("plate.tif");
	let output = dir.path().join("out/plate.tif");
	let original = DynamicImage::ImageRgb8(gradient(64, 48));
	write_uncompressed(&original, &input);

	LzwTiffConverter.compress(&input, &output).unwrap();

	assert_eq!(compression_of(&output), LZW);
	let converted = image::open(&output).unwrap();
	assert_eq!(converted.to_rgb8(), original.to_rgb8());
}

#[test]
fn sixteen_bit_depth_is_kept() {
	let dir = tempdir().unwrap();
	let input = dir.path().join("deep.tiff");
	let output = dir.path().join("deep.tiff.out");
	let original = DynamicImage::ImageRgba16(ImageBuffer::from_fn(16, 16, |x, y| {
		Rgba([(x * 4000) as u16, (y * 4000) as u16, 1234, u16::MAX])
	}));
	write_uncompressed(&original, &input);

	LzwTiffConverter.compress(&input, &output).unwrap();

	let converted = image::open(&output).unwrap();
	assert!(matches!(converted, DynamicImage::ImageRgba16(_)));
	assert_eq!(converted.to_rgba16(), original.to_rgba16());
}

#[test]
fn gray_alpha_is_widened_to_rgba() {
	let dir = tempdir().unwrap();
	let input = dir.path().join("mask.tif");
	let output = dir.path().join("mask-lzw.tif");
	let original = DynamicImage::ImageLumaA8(GrayAlphaImage::from_pixel(8, 8, LumaA([90, 200])));
	// the tiff encoder cannot store gray+alpha either, so the fixture is rgba already
	write_uncompressed(&DynamicImage::ImageRgba8(original.to_rgba8()), &input);

	LzwTiffConverter.compress(&input, &output).unwrap();

	let converted = image::open(&output).unwrap();
	assert_eq!(converted.to_rgba8().get_pixel(0, 0), &Rgba([90, 90, 90, 200]));
}

#[test]
fn compressing_twice_gives_the_same_bytes() {
	let dir = tempdir().unwrap();
	let input = dir.path().join("scan.tif");
	let output = dir.path().join("scan-lzw.tif");
	write_uncompressed(&DynamicImage::ImageRgb8(gradient(32, 32)), &input);

	LzwTiffConverter.compress(&input, &output).unwrap();
	let first = fs::read(&output).unwrap();
	LzwTiffConverter.compress(&input, &output).unwrap();
	let second = fs::read(&output).unwrap();
	assert_eq!(first, second);
}

#[test]
fn compressing_in_place_replaces_the_source() {
	let dir = tempdir().unwrap();
	let path = dir.path().join("scan.tif");
	let original = DynamicImage::ImageRgb8(gradient(40, 40));
	write_uncompressed(&original, &path);

	LzwTiffConverter.compress(&path, &path).unwrap();

	assert_eq!(compression_of(&path), LZW);
	assert_eq!(image::open(&path).unwrap().to_rgb8(), original.to_rgb8());
	assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn batch_with_a_missing_input() {
	let dir = tempdir().unwrap();
	let out = dir.path().join("out");
	let first = dir.path().join("1.tif");
	let missing = dir.path().join("2.tif");
	let third = dir.path().join("3.tif");
	write_uncompressed(&DynamicImage::ImageRgb8(gradient(10, 10)), &first);
	write_uncompressed(&DynamicImage::ImageRgb8(gradient(12, 12)), &third);

	let (tx, rx) = mpsc::channel();
	let tx = Mutex::new(tx);
	let mut runner = JobRunner::new(
		move |event: CompletionEvent| {
			let _ = tx.lock().unwrap().send(event);
		},
		RunnerSettings::default(),
	);
	let tasks = [&first, &missing, &third]
		.into_iter()
		.map(|input| Task::new(input, out.join(input.file_name().unwrap())))
		.collect();
	runner.start(Arc::new(LzwTiffConverter), tasks).unwrap();

	let mut events: Vec<_> = (0..3).map(|_| rx.recv_timeout(Duration::from_secs(30)).unwrap()).collect();
	events.sort_by(|a, b| a.input().cmp(b.input()));

	assert!(events[0].success());
	assert!(!events[1].success());
	assert!(events[1].error_message().unwrap().contains("2.tif"));
	assert!(events[2].success());
	assert_eq!(compression_of(&out.join("1.tif")), LZW);
	assert!(!out.join("2.tif").exists());
}

#[test]
fn resolution_and_icc_profile_are_kept() {
	let dir = tempdir().unwrap();
	let input = dir.path().join("scan.tif");
	let output = dir.path().join("out/scan.tif");
	let icc: Vec<u8> = (0..=255).collect();
	{
		let mut encoder = TiffEncoder::new(File::create(&input).unwrap()).unwrap();
		let mut image = encoder.new_image::<Gray8>(20, 10).unwrap();
		image.resolution(ResolutionUnit::Inch, Rational { n: 600, d: 1 });
		image.encoder().write_tag(ICC_PROFILE, &icc[..]).unwrap();
		image.encoder().write_tag(Tag::Artist, "archive").unwrap();
		image.write_data(&[128u8; 200]).unwrap();
	}

	LzwTiffConverter.compress(&input, &output).unwrap();

	assert_eq!(compression_of(&output), LZW);
	assert!(matches!(tag(&output, Tag::XResolution), Some(Value::Rational(600, 1))));
	assert!(matches!(tag(&output, Tag::YResolution), Some(Value::Rational(600, 1))));
	let mut decoder = Decoder::new(File::open(&output).unwrap()).unwrap();
	assert_eq!(decoder.get_tag_u32(Tag::ResolutionUnit).unwrap(), 2);
	assert_eq!(decoder.get_tag_ascii_string(Tag::Artist).unwrap(), "archive");
	let kept: Vec<u64> = decoder.find_tag(ICC_PROFILE).unwrap().unwrap().into_u64_vec().unwrap();
	assert_eq!(kept, icc.iter().map(|&b| u64::from(b)).collect::<Vec<_>>());
}

#[test]
fn bilevel_scans_are_not_inflated() {
	let dir = tempdir().unwrap();
	let input = dir.path().join("fax.tif");
	let output = dir.path().join("fax-lzw.tif");
	let black = |x: u32, y: u32| (20..60).contains(&x) && (10..30).contains(&y);
	write_bilevel(&input, 101, 40, black);

	LzwTiffConverter.compress(&input, &output).unwrap();

	let mut decoder = Decoder::new(File::open(&output).unwrap()).unwrap();
	assert_eq!(decoder.get_tag_u32(Tag::BitsPerSample).unwrap(), 1);
	assert_eq!(decoder.get_tag_u32(Tag::Compression).unwrap() as u16, LZW);
	assert_eq!(decoder.dimensions().unwrap(), (101, 40));

	let converted = image::open(&output).unwrap().to_luma8();
	assert_eq!(converted.get_pixel(30, 20), &Luma([0]));
	assert_eq!(converted.get_pixel(0, 0), &Luma([255]));
	assert_eq!(converted.get_pixel(100, 39), &Luma([255]));
	// one bit per pixel, well under the 8-bit size
	assert!(fs::metadata(&output).unwrap().len() < 101 * 40 / 4);
}
