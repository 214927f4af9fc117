use agonquant::{
    ColorMetric, DitherMode, Error, Method, Palette, PixelFormat, QuantizeConfig, Quantizer,
    delta, pixel, rgba_pixels, rle,
};

const METHODS: [Method; 6] = [
    Method::Rgb,
    Method::Hsv,
    Method::Cmyk,
    Method::Floyd,
    Method::Bayer,
    Method::Atkinson,
];

fn primaries() -> Palette {
    Palette::from_rgb(&[
        [0, 0, 0],
        [255, 255, 255],
        [255, 0, 0],
        [0, 255, 0],
        [0, 0, 255],
        [255, 255, 0],
        [0, 255, 255],
        [255, 0, 255],
    ])
    .unwrap()
}

fn gradient(width: usize, height: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(width * height * 4);
    for y in 0..height {
        for x in 0..width {
            out.extend_from_slice(&[
                (x * 255 / width) as u8,
                (y * 255 / height) as u8,
                ((x + y) * 127 / (width + height)) as u8,
                255,
            ]);
        }
    }
    out
}

#[test]
fn black_square_packs_to_opaque_zero() {
    let palette = Palette::from_rgb(&[[0, 0, 0], [255, 255, 255]]).unwrap();
    let quantizer = Quantizer::new(&palette, QuantizeConfig::new()).unwrap();
    let black = [0u8, 0, 0, 255].repeat(4);

    let snapped = quantizer.quantize_to_rgba32(&black, 2, 2).unwrap();
    assert_eq!(snapped, black);

    let packed = pixel::rgba32_to_rgba2(&snapped, 2, 2).unwrap();
    assert_eq!(packed, vec![0xC0; 4]);
    assert_eq!(rle::decode(&rle::encode(&packed)).unwrap(), packed);
}

#[test]
fn palette_colors_survive_every_method() {
    let palette = primaries();
    let pixels: Vec<u8> = palette
        .entries()
        .iter()
        .flat_map(|c| [c[0], c[1], c[2], 255])
        .collect();

    for method in METHODS {
        let quantizer = Quantizer::new(&palette, QuantizeConfig::from_method(method)).unwrap();
        let out = quantizer.quantize_to_rgba32(&pixels, 4, 2).unwrap();
        assert_eq!(out, pixels, "{method:?} moved an exact palette color");
    }
}

#[test]
fn quantization_is_deterministic() {
    let palette = primaries();
    let image = gradient(24, 16);
    for method in METHODS {
        let config = QuantizeConfig::from_method(method);
        let a = Quantizer::new(&palette, config.clone())
            .unwrap()
            .quantize_bytes(&image, 24, 16)
            .unwrap();
        let b = Quantizer::new(&palette, config)
            .unwrap()
            .quantize_bytes(&image, 24, 16)
            .unwrap();
        assert_eq!(a, b, "{method:?}");
        assert!(a.indices().iter().all(|&i| (i as usize) < palette.len()));
    }
}

#[test]
fn output_colors_come_from_the_palette() {
    let palette = primaries();
    let allowed: Vec<[u8; 3]> = palette.entries();
    let image = gradient(20, 20);
    for method in METHODS {
        let quantizer = Quantizer::new(&palette, QuantizeConfig::from_method(method)).unwrap();
        let out = quantizer.quantize_to_rgba32(&image, 20, 20).unwrap();
        for px in out.chunks_exact(4) {
            assert!(allowed.contains(&[px[0], px[1], px[2]]), "{method:?} produced {px:?}");
            assert_eq!(px[3], 255);
        }
    }
}

#[test]
fn transparent_key_pixels_lose_their_alpha() {
    let palette = primaries();
    let key = [12, 34, 56, 255];
    let mut image = gradient(8, 8);
    image[..4].copy_from_slice(&key);
    image[60..64].copy_from_slice(&key);

    for method in METHODS {
        let config = QuantizeConfig::from_method(method).transparent(Some(key));
        let result = agonquant::quantize(&rgba_pixels(&image), 8, 8, &palette, &config).unwrap();
        assert_eq!(result.palette().len(), palette.len());
        assert_eq!(result.alpha()[0], 0);
        assert_eq!(result.alpha()[15], 0);
        assert_eq!(result.alpha().iter().filter(|&&a| a == 0).count(), 2, "{method:?}");
        assert!(result.indices().iter().all(|&i| (i as usize) < palette.len()));

        let preview = result.to_rgba32();
        assert_eq!(preview[3], 0);
        let packed = pixel::rgba32_to_rgba2(&preview, 8, 8).unwrap();
        assert_eq!(packed[0] >> 6, 0);
        assert_eq!(packed[1] >> 6, 3);
    }
}

#[test]
fn source_alpha_is_kept() {
    let palette = Palette::from_rgb(&[[0, 0, 0], [255, 255, 255]]).unwrap();
    let pixels = [255u8, 255, 255, 0, 255, 255, 255, 255, 250, 250, 250, 100];
    for method in METHODS {
        let quantizer = Quantizer::new(&palette, QuantizeConfig::from_method(method)).unwrap();
        let snapped = quantizer.quantize_to_rgba32(&pixels, 3, 1).unwrap();
        assert_eq!(
            snapped,
            vec![255, 255, 255, 0, 255, 255, 255, 255, 255, 255, 255, 100],
            "{method:?}"
        );
        let packed = pixel::rgba32_to_rgba2(&snapped, 3, 1).unwrap();
        assert_eq!(packed, vec![0x3F, 0xFF, 0x7F]);
    }
}

#[test]
fn key_with_zero_alpha_is_ignored() {
    let palette = primaries();
    let config = QuantizeConfig::new().transparent(Some([0, 0, 0, 0]));
    let result =
        agonquant::quantize(&rgba_pixels(&[0, 0, 0, 255]), 1, 1, &palette, &config).unwrap();
    assert_eq!(result.alpha(), &[255]);
    assert_eq!(result.indices(), &[0]);
}

#[test]
fn full_palette_accepts_a_key() {
    let entries: Vec<[u8; 3]> = (0..=255u8).map(|i| [i, i, i]).collect();
    let palette = Palette::from_rgb(&entries).unwrap();
    let quantizer =
        Quantizer::new(&palette, QuantizeConfig::new().transparent(Some([255, 0, 255, 255])))
            .unwrap();
    let image = [255u8, 0, 255, 255, 7, 7, 7, 255, 255, 255, 255, 255];
    let out = quantizer.quantize_bytes(&image, 3, 1).unwrap();
    assert_eq!(out.alpha(), &[0, 255, 255]);
    assert_eq!(&out.indices()[1..], &[7, 255]);
}

#[test]
fn invalid_inputs_are_rejected() {
    let palette = primaries();
    let quantizer = Quantizer::new(&palette, QuantizeConfig::new()).unwrap();
    assert!(matches!(
        quantizer.quantize_bytes(&[], 0, 4),
        Err(Error::ZeroDimension)
    ));
    assert!(matches!(
        quantizer.quantize_bytes(&[0; 12], 2, 2),
        Err(Error::BufferLength { .. })
    ));
    assert!(matches!("sepia".parse::<Method>(), Err(Error::UnknownMethod(_))));
}

#[test]
fn method_names_pick_metric_and_dither() {
    let floyd: Method = "floyd".parse().unwrap();
    assert_eq!(floyd.metric(), ColorMetric::Rgb);
    assert_eq!(floyd.dither(), DitherMode::FloydSteinberg);
    let hsv: Method = "HSV".parse().unwrap();
    assert_eq!(hsv.metric(), ColorMetric::Hsv);
    assert_eq!(hsv.dither(), DitherMode::None);
}

#[test]
fn delta_of_identical_frames_is_all_mask() {
    let frame = pixel::rgba32_to_rgba2(&gradient(6, 5), 6, 5).unwrap();
    assert_eq!(delta::delta(&frame, &frame).unwrap(), vec![0xC0; frame.len()]);
    let d = delta::delta(&frame, &delta::initial_frame(frame.len())).unwrap();
    assert_eq!(delta::undelta(&d, &delta::initial_frame(frame.len())).unwrap(), frame);
}

#[test]
fn rle_handles_edge_inputs() {
    for data in [
        Vec::new(),
        vec![7u8],
        vec![0xC0; 1000],
        (0..=255u8).collect::<Vec<_>>(),
        [vec![1, 2], vec![9; 3], vec![3]].concat(),
    ] {
        assert_eq!(rle::decode(&rle::encode(&data)).unwrap(), data);
    }
    assert!(rle::encode(&[]).is_empty());
}

#[test]
fn packed_formats_have_expected_sizes() {
    let image = gradient(5, 3);
    assert_eq!(pixel::rgba32_to_rgba2(&image, 5, 3).unwrap().len(), 15);
    assert_eq!(pixel::rgba32_to_rgba8(&image, 5, 3).unwrap().len(), 60);
    assert!(matches!(
        PixelFormat::Rgba2.check_len(14, 5, 3),
        Err(Error::BufferLength { expected: 15, .. })
    ));
}

#[test]
fn rgba8_file_layout() {
    let image = [10u8, 20, 30, 200, 1, 2, 3, 50, 255, 0, 128, 128];
    let packed = pixel::rgba32_to_rgba8(&image, 3, 1).unwrap();
    assert_eq!(packed, vec![10, 20, 30, 255, 0, 0, 0, 0, 255, 0, 128, 255]);
    assert_eq!(pixel::rgba8_to_rgba32(&packed, 3, 1).unwrap(), packed);
}

#[test]
fn packed_round_trip_is_idempotent_after_first_pass() {
    let image = gradient(9, 7);
    for (pack, unpack) in [
        (
            pixel::rgba32_to_rgba2 as fn(&[u8], usize, usize) -> agonquant::Result<Vec<u8>>,
            pixel::rgba2_to_rgba32 as fn(&[u8], usize, usize) -> agonquant::Result<Vec<u8>>,
        ),
        (pixel::rgba32_to_rgba8, pixel::rgba8_to_rgba32),
    ] {
        let once = unpack(&pack(&image, 9, 7).unwrap(), 9, 7).unwrap();
        let twice = unpack(&pack(&once, 9, 7).unwrap(), 9, 7).unwrap();
        assert_eq!(once, twice);
    }
}
