use veil::{BufferedRandom, MaskDescriptor, Validator, deserialize, generate, generate_with, serialize};

const HEADER_LEN: usize = 24;

fn small_descriptor() -> MaskDescriptor {
    MaskDescriptor {
        frames_count: 4,
        frame_duration: 33,
        canvas_size: 10,
        particles_count: 1,
        particle_sprites_count: 1,
        particle_size_min: 2.0,
        particle_size_max: 2.0,
        particle_fade_in: 1,
        particle_shown: 1,
        particle_fade_out: 1,
    }
}

fn small_mask() -> veil::CachedMask {
    let mut random = BufferedRandom::from_words(vec![0, 3, 4]);
    generate_with(&small_descriptor(), &mut random)
}

fn validator_for(descriptor: &MaskDescriptor) -> Validator {
    Validator {
        frame_duration: descriptor.frame_duration,
        frames_count: descriptor.frames_count,
        canvas_size: descriptor.canvas_size,
    }
}

#[test]
fn end_to_end_small_descriptor() {
    let mask = small_mask();
    assert_eq!(mask.image().width(), 40);
    assert_eq!(mask.image().height(), 10);
    assert_eq!(mask.frames_count(), 4);
    assert_eq!(mask.canvas_size(), 10);
}

#[test]
fn atlas_shape_for_60_frames_at_100px() {
    let descriptor = MaskDescriptor {
        particles_count: 50,
        ..MaskDescriptor::default_mask()
    };
    let mask = generate(&descriptor);
    assert_eq!(mask.image().width(), 1000);
    assert_eq!(mask.image().height(), 600);
}

#[test]
fn round_trip_reproduces_the_mask() {
    let descriptor = small_descriptor();
    let mask = small_mask();
    let bytes = serialize(&mask).unwrap();

    let back = deserialize(&bytes, Some(&validator_for(&descriptor))).unwrap();
    assert_eq!(back.frames_count(), mask.frames_count());
    assert_eq!(back.frame_duration(), mask.frame_duration());
    assert_eq!(back.canvas_size(), mask.canvas_size());
    assert_eq!(back.image(), mask.image());
}

#[test]
fn round_trip_without_validator() {
    let mask = small_mask();
    let bytes = serialize(&mask).unwrap();
    assert!(deserialize(&bytes, None).is_some());
}

#[test]
fn flipping_payload_bytes_is_always_detected() {
    let mask = small_mask();
    let bytes = serialize(&mask).unwrap();

    for index in HEADER_LEN..bytes.len() {
        let mut corrupt = bytes.clone();
        corrupt[index] ^= 0x01;
        assert!(
            deserialize(&corrupt, None).is_none(),
            "flip at byte {index} went undetected"
        );
    }
}

#[test]
fn validator_mismatches_are_rejected() {
    let descriptor = small_descriptor();
    let bytes = serialize(&small_mask()).unwrap();
    let good = validator_for(&descriptor);
    assert!(deserialize(&bytes, Some(&good)).is_some());

    let wrong_duration = Validator {
        frame_duration: good.frame_duration + 1,
        ..good
    };
    let wrong_frames = Validator {
        frames_count: good.frames_count + 1,
        ..good
    };
    let wrong_canvas = Validator {
        canvas_size: good.canvas_size + 1,
        ..good
    };
    assert!(deserialize(&bytes, Some(&wrong_duration)).is_none());
    assert!(deserialize(&bytes, Some(&wrong_frames)).is_none());
    assert!(deserialize(&bytes, Some(&wrong_canvas)).is_none());
}

#[test]
fn truncated_buffers_are_rejected() {
    let bytes = serialize(&small_mask()).unwrap();
    assert!(deserialize(&bytes[..HEADER_LEN], None).is_none());
    assert!(deserialize(&bytes[..bytes.len() - 1], None).is_none());
    assert!(deserialize(&bytes[..HEADER_LEN / 2], None).is_none());
}

#[test]
fn version_mismatch_is_rejected() {
    let mut bytes = serialize(&small_mask()).unwrap();
    bytes[0] = bytes[0].wrapping_add(1);
    assert!(deserialize(&bytes, None).is_none());
}

#[test]
fn non_positive_header_fields_are_rejected() {
    let bytes = serialize(&small_mask()).unwrap();
    for offset in [12, 16, 20] {
        let mut corrupt = bytes.clone();
        corrupt[offset..offset + 4].copy_from_slice(&0i32.to_le_bytes());
        assert!(deserialize(&corrupt, None).is_none());

        corrupt[offset..offset + 4].copy_from_slice(&(-1i32).to_le_bytes());
        assert!(deserialize(&corrupt, None).is_none());
    }
}

#[test]
fn length_mismatch_is_rejected() {
    let mut bytes = serialize(&small_mask()).unwrap();
    bytes.push(0);
    assert!(deserialize(&bytes, None).is_none());
}

#[test]
fn wrong_payload_pixel_format_is_rejected() {
    // A record whose payload is a well-formed PNG of the right dimensions
    // but the wrong pixel format must still be rejected.
    let mask = small_mask();
    let good = serialize(&mask).unwrap();

    let rgb = image::DynamicImage::ImageRgb8(image::RgbImage::new(40, 10));
    let mut payload = Vec::new();
    rgb.write_to(
        &mut std::io::Cursor::new(&mut payload),
        image::ImageFormat::Png,
    )
    .unwrap();

    let mut bytes = good[..HEADER_LEN].to_vec();
    bytes[4..8].copy_from_slice(&(payload.len() as u32).to_le_bytes());
    let hash = twox_hash::XxHash32::oneshot(0, &payload);
    bytes[8..12].copy_from_slice(&hash.to_le_bytes());
    bytes.extend_from_slice(&payload);

    assert!(deserialize(&bytes, None).is_none());
}

#[test]
fn wrong_payload_dimensions_are_rejected() {
    // Grayscale payload, correct format, but one row short of the grid.
    let good = serialize(&small_mask()).unwrap();

    let gray = image::DynamicImage::ImageLuma8(image::GrayImage::new(40, 9));
    let mut payload = Vec::new();
    gray.write_to(
        &mut std::io::Cursor::new(&mut payload),
        image::ImageFormat::Png,
    )
    .unwrap();

    let mut bytes = good[..HEADER_LEN].to_vec();
    bytes[4..8].copy_from_slice(&(payload.len() as u32).to_le_bytes());
    let hash = twox_hash::XxHash32::oneshot(0, &payload);
    bytes[8..12].copy_from_slice(&hash.to_le_bytes());
    bytes.extend_from_slice(&payload);

    assert!(deserialize(&bytes, None).is_none());
}

#[test]
fn colorized_and_darkened_round_trip_metadata() {
    let mask = small_mask();
    let red = mask.colorized(veil::Rgba8::new(255, 0, 0, 255));
    assert_eq!(red.frames_count(), mask.frames_count());
    assert_eq!(red.canvas_size(), mask.canvas_size());

    let dark = mask.darkened(32);
    assert_eq!(dark.frames_count(), mask.frames_count());
    assert_eq!(dark.frame_duration(), mask.frame_duration());
}
