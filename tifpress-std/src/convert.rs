use std::{
	fs::{self, File},
	io::{BufWriter, Seek, Write},
	path::{Path, PathBuf},
};

use image::{DynamicImage, ExtendedColorType, GrayImage, ImageDecoder, ImageFormat, ImageReader};
use thiserror::Error;
use tiff::{
	decoder::{ifd::Value, Decoder, Limits},
	encoder::{
		colortype::{self, ColorType},
		compression::Lzw,
		DirectoryEncoder, Rational, TiffEncoder, TiffKind, TiffValue,
	},
	tags::{PhotometricInterpretation, SampleFormat, Tag},
	TiffResult,
};
use tifpress_sdk::plugins::converter::Converter;

const ICC_PROFILE: Tag = Tag::Unknown(34675);
const XMP: Tag = Tag::Unknown(700);
const TEXT_TAGS: [Tag; 8] = [
	Tag::ImageDescription,
	Tag::Make,
	Tag::Model,
	Tag::Software,
	Tag::DateTime,
	Tag::Artist,
	Tag::HostComputer,
	Tag::Copyright,
];

#[derive(Error, Debug)]
pub enum ConvertError {
	#[error("could not open {}", path.display())]
	Open {
		#[source]
		source: std::io::Error,
		path: PathBuf,
	},

	#[error("{} is not a TIFF image", .0.display())]
	NotTiff(PathBuf),

	#[error("could not decode {}", path.display())]
	Decode {
		#[source]
		source: image::ImageError,
		path: PathBuf,
	},

	#[error("could not read the tags of {}", path.display())]
	Metadata {
		#[source]
		source: tiff::TiffError,
		path: PathBuf,
	},

	#[error("could not encode {}", path.display())]
	Encode {
		#[source]
		source: tiff::TiffError,
		path: PathBuf,
	},

	#[error("could not write {}", path.display())]
	Write {
		#[source]
		source: std::io::Error,
		path: PathBuf,
	},
}

/// Re-encodes the first page of a TIFF with LZW compression.
///
/// Resolution, orientation, the ICC profile, XMP and the descriptive text tags of the source
/// are carried over. Bilevel images stay at one bit per pixel.
///
/// The image is written to a temporary file next to the destination and renamed over it
/// once complete, so a failed conversion never leaves a truncated output behind.
#[derive(Debug, Clone, Copy, Default)]
pub struct LzwTiffConverter;

impl LzwTiffConverter {
	#[tracing::instrument(level = "debug", skip(self))]
	pub fn compress(&self, input: &Path, output: &Path) -> Result<(), ConvertError> {
		let (image, source_type) = decode(input)?;
		let metadata = Metadata::read(input)?;
		let pixels = if source_type == ExtendedColorType::L1 {
			Pixels::Bilevel(image.to_luma8())
		} else {
			Pixels::Full(image)
		};

		let parent = output
			.parent()
			.filter(|p| !p.as_os_str().is_empty())
			.unwrap_or_else(|| Path::new("."));
		let write_err = |source| ConvertError::Write {
			source,
			path: output.to_path_buf(),
		};
		fs::create_dir_all(parent).map_err(write_err)?;

		let mut builder = tempfile::Builder::new();
		builder.prefix(".tifpress-").suffix(".part");
		#[cfg(unix)]
		{
			use std::os::unix::fs::PermissionsExt;
			builder.permissions(fs::Permissions::from_mode(0o644));
		}
		let mut staging = builder.tempfile_in(parent).map_err(write_err)?;

		{
			let mut writer = BufWriter::new(staging.as_file_mut());
			encode(&pixels, &metadata, &mut writer).map_err(|source| ConvertError::Encode {
				source,
				path: output.to_path_buf(),
			})?;
			writer.flush().map_err(write_err)?;
		}

		staging.persist(output).map_err(|e| write_err(e.error))?;
		tracing::debug!(?source_type, tags = metadata.tag_count(), "Image written with LZW compression.");
		Ok(())
	}
}

impl Converter for LzwTiffConverter {
	fn convert(&self, input: &Path, output: &Path) -> anyhow::Result<()> {
		Ok(self.compress(input, output)?)
	}
}

fn decode(input: &Path) -> Result<(DynamicImage, ExtendedColorType), ConvertError> {
	let open_err = |source| ConvertError::Open {
		source,
		path: input.to_path_buf(),
	};
	let decode_err = |source| ConvertError::Decode {
		source,
		path: input.to_path_buf(),
	};
	let mut reader = ImageReader::open(input)
		.map_err(open_err)?
		.with_guessed_format()
		.map_err(open_err)?;
	if reader.format() != Some(ImageFormat::Tiff) {
		return Err(ConvertError::NotTiff(input.to_path_buf()));
	}
	reader.no_limits();
	let decoder = reader.into_decoder().map_err(decode_err)?;
	let source_type = decoder.original_color_type();
	let image = DynamicImage::from_decoder(decoder).map_err(decode_err)?;
	Ok((image, source_type))
}

/// Tags of the source's first page that survive re-encoding.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct Metadata {
	resolution_unit: Option<u16>,
	x_resolution: Option<(u32, u32)>,
	y_resolution: Option<(u32, u32)>,
	orientation: Option<u16>,
	text: Vec<(Tag, String)>,
	blobs: Vec<(Tag, Vec<u8>)>,
}

impl Metadata {
	fn read(input: &Path) -> Result<Self, ConvertError> {
		let metadata_err = |source| ConvertError::Metadata {
			source,
			path: input.to_path_buf(),
		};
		let file = File::open(input).map_err(|source| ConvertError::Open {
			source,
			path: input.to_path_buf(),
		})?;
		let mut decoder = Decoder::new(file)
			.map_err(metadata_err)?
			.with_limits(Limits::unlimited());

		let mut metadata = Self {
			resolution_unit: decoder.find_tag_unsigned(Tag::ResolutionUnit).map_err(metadata_err)?,
			x_resolution: decoder.find_tag(Tag::XResolution).map_err(metadata_err)?.and_then(rational),
			y_resolution: decoder.find_tag(Tag::YResolution).map_err(metadata_err)?.and_then(rational),
			orientation: decoder.find_tag_unsigned(Tag::Orientation).map_err(metadata_err)?,
			..Default::default()
		};
		for tag in TEXT_TAGS {
			if let Some(Value::Ascii(text)) = decoder.find_tag(tag).map_err(metadata_err)? {
				if text.is_ascii() && !text.contains('\0') {
					metadata.text.push((tag, text));
				}
			}
		}
		for tag in [ICC_PROFILE, XMP] {
			if let Some(bytes) = decoder.find_tag(tag).map_err(metadata_err)?.and_then(bytes) {
				metadata.blobs.push((tag, bytes));
			}
		}
		Ok(metadata)
	}

	fn tag_count(&self) -> usize {
		[self.resolution_unit.is_some(), self.x_resolution.is_some(), self.y_resolution.is_some(), self.orientation.is_some()]
			.into_iter()
			.filter(|present| *present)
			.count()
			+ self.text.len()
			+ self.blobs.len()
	}

	/// Overrides the defaults the encoder wrote for the new directory.
	fn apply<W: Write + Seek, K: TiffKind>(&self, dir: &mut DirectoryEncoder<'_, W, K>) -> TiffResult<()> {
		if let Some(unit) = self.resolution_unit {
			dir.write_tag(Tag::ResolutionUnit, unit)?;
		}
		if let Some((n, d)) = self.x_resolution {
			dir.write_tag(Tag::XResolution, Rational { n, d })?;
		}
		if let Some((n, d)) = self.y_resolution {
			dir.write_tag(Tag::YResolution, Rational { n, d })?;
		}
		if let Some(orientation) = self.orientation {
			dir.write_tag(Tag::Orientation, orientation)?;
		}
		for (tag, text) in &self.text {
			dir.write_tag(*tag, text.as_str())?;
		}
		for (tag, bytes) in &self.blobs {
			dir.write_tag(*tag, bytes.as_slice())?;
		}
		Ok(())
	}
}

fn rational(value: Value) -> Option<(u32, u32)> {
	match value {
		Value::Rational(n, d) => Some((n, d)),
		Value::RationalBig(n, d) => Some((u32::try_from(n).ok()?, u32::try_from(d).ok()?)),
		_ => None,
	}
}

/// Byte payloads come back as `Byte` for UNDEFINED and as unsigned values for BYTE.
fn bytes(value: Value) -> Option<Vec<u8>> {
	let byte = |value: Value| match value {
		Value::Byte(b) => Some(b),
		Value::Unsigned(v) => u8::try_from(v).ok(),
		Value::UnsignedBig(v) => u8::try_from(v).ok(),
		_ => None,
	};
	match value {
		Value::List(values) => values.into_iter().map(byte).collect(),
		single => byte(single).map(|b| vec![b]),
	}
}

enum Pixels {
	Full(DynamicImage),
	/// A black and white source, expanded to 0/255 by the decoder.
	Bilevel(GrayImage),
}

/// One bit per pixel, 0 is black.
struct Bilevel;

impl ColorType for Bilevel {
	type Inner = u8;
	const TIFF_VALUE: PhotometricInterpretation = PhotometricInterpretation::BlackIsZero;
	const BITS_PER_SAMPLE: &'static [u16] = &[1];
	const SAMPLE_FORMAT: &'static [SampleFormat] = &[SampleFormat::Uint];
}

/// Packs rows MSB first; every row starts on a byte boundary.
fn pack_bits(image: &GrayImage) -> Vec<u8> {
	let row_bytes = image.width().div_ceil(8) as usize;
	let mut packed = vec![0u8; row_bytes * image.height() as usize];
	for (x, y, pixel) in image.enumerate_pixels() {
		if pixel.0[0] >= 128 {
			packed[y as usize * row_bytes + x as usize / 8] |= 0x80 >> (x % 8);
		}
	}
	packed
}

fn write_lzw<C, W>(
	encoder: &mut TiffEncoder<W>,
	(width, height): (u32, u32),
	metadata: &Metadata,
	data: &[C::Inner],
) -> TiffResult<()>
where
	C: ColorType,
	W: Write + Seek,
	[C::Inner]: TiffValue,
{
	let mut image = encoder.new_image_with_compression::<C, _>(width, height, Lzw::default())?;
	metadata.apply(image.encoder())?;
	image.write_data(data)
}

fn encode<W: Write + Seek>(pixels: &Pixels, metadata: &Metadata, writer: W) -> TiffResult<()> {
	let mut encoder = TiffEncoder::new(writer)?;
	let image = match pixels {
		Pixels::Full(image) => image,
		Pixels::Bilevel(gray) => {
			// The strip layout is computed from the width in samples, so the encoder is
			// handed the packed row length and the real width is restored afterwards.
			let packed = pack_bits(gray);
			let row_bytes = gray.width().div_ceil(8);
			let mut image =
				encoder.new_image_with_compression::<Bilevel, _>(row_bytes, gray.height(), Lzw::default())?;
			metadata.apply(image.encoder())?;
			image.encoder().write_tag(Tag::ImageWidth, gray.width())?;
			return image.write_data(&packed);
		}
	};

	let size = (image.width(), image.height());
	match image {
		DynamicImage::ImageLuma8(buf) => write_lzw::<colortype::Gray8, _>(&mut encoder, size, metadata, buf.as_raw()),
		DynamicImage::ImageLuma16(buf) => write_lzw::<colortype::Gray16, _>(&mut encoder, size, metadata, buf.as_raw()),
		DynamicImage::ImageRgb8(buf) => write_lzw::<colortype::RGB8, _>(&mut encoder, size, metadata, buf.as_raw()),
		DynamicImage::ImageRgb16(buf) => write_lzw::<colortype::RGB16, _>(&mut encoder, size, metadata, buf.as_raw()),
		DynamicImage::ImageRgba8(buf) => write_lzw::<colortype::RGBA8, _>(&mut encoder, size, metadata, buf.as_raw()),
		DynamicImage::ImageRgba16(buf) => write_lzw::<colortype::RGBA16, _>(&mut encoder, size, metadata, buf.as_raw()),
		// no gray+alpha colortype in the encoder
		DynamicImage::ImageLumaA8(_) => {
			write_lzw::<colortype::RGBA8, _>(&mut encoder, size, metadata, image.to_rgba8().as_raw())
		}
		DynamicImage::ImageRgb32F(_) => {
			write_lzw::<colortype::RGB16, _>(&mut encoder, size, metadata, image.to_rgb16().as_raw())
		}
		_ => write_lzw::<colortype::RGBA16, _>(&mut encoder, size, metadata, image.to_rgba16().as_raw()),
	}
}
