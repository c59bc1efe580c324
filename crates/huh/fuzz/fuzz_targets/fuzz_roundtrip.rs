#![no_main]

use arbitrary::Arbitrary;
use huh::{decode_bytes, encode_to_writer, EncodeOptions, Metadata, NoProgress};
use image::RgbImage;
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
struct FuzzInput {
    width: u8,
    height: u8,
    pixels: Vec<u8>,
    metadata: Vec<(String, String)>,
    level: u8,
}

fuzz_target!(|input: FuzzInput| {
    let width = input.width as u32 % 64;
    let height = input.height as u32 % 64;

    // Ensure we have enough pixels (RGB = 3 bytes per pixel)
    let expected_size = (width * height * 3) as usize;
    if input.pixels.len() < expected_size {
        return;
    }
    let image = match RgbImage::from_raw(width, height, input.pixels[..expected_size].to_vec()) {
        Some(image) => image,
        None => return,
    };
    let metadata: Metadata = input.metadata.into_iter().collect();
    let opts = EncodeOptions {
        compression_level: u32::from(input.level % 10),
    };

    let data = encode_to_writer(Vec::new(), &image, &metadata, &opts, &mut NoProgress)
        .expect("in-memory encode should not fail");
    let decoded = decode_bytes(&data).expect("freshly encoded data should decode");

    assert_eq!((decoded.width, decoded.height), (width, height));
    assert_eq!(decoded.metadata, metadata);
    assert_eq!(decoded.pixels, image.into_raw());
});
