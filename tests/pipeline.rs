use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use agonquant::agm::MovieReader;
use agonquant::rle::Deflate;
use agonquant::source::MemorySource;
use agonquant::{Error, Palette, PipelineConfig, Player, pixel, video};

fn palette() -> Palette {
    Palette::from_rgb(&[[0, 0, 0], [255, 255, 255], [255, 0, 0], [0, 0, 255]]).unwrap()
}

fn frames() -> Vec<Vec<u8>> {
    let a = [[0u8, 0, 0, 255], [255, 255, 255, 255], [250, 5, 5, 255], [0, 0, 0, 255]].concat();
    let b = [[0u8, 0, 255, 255], [255, 255, 255, 255], [250, 5, 5, 255], [0, 0, 0, 255]].concat();
    vec![a.clone(), b, a]
}

fn expected_rgba2() -> Vec<Vec<u8>> {
    frames()
        .iter()
        .map(|f| pixel::rgba32_to_rgba2(f, 2, 2).unwrap())
        .collect()
}

#[test]
fn movie_plays_back_the_encoded_frames() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("clip.agm");
    let mut source = MemorySource::new(2, 2, frames()).unwrap();

    let stats = video::process(
        &mut source,
        &out,
        &palette(),
        PipelineConfig::new(2, 2).lookback(4),
    )
    .unwrap();
    assert_eq!(stats.frames, 3);
    assert_eq!(stats.reused, 1);
    assert_eq!(stats.written_bytes, std::fs::metadata(&out).unwrap().len());

    let played: Vec<Vec<u8>> = Player::open(&out, 2, 2, true)
        .unwrap()
        .map(|f| f.unwrap().into_data())
        .collect();
    assert_eq!(played, expected_rgba2());

    // No temporaries left next to the output.
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn single_black_frame_file_layout() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("black.agm");
    let mut source = MemorySource::new(2, 2, vec![[0u8, 0, 0, 255].repeat(4)]).unwrap();
    video::process(&mut source, &out, &palette(), PipelineConfig::new(2, 2)).unwrap();

    let bytes = std::fs::read(&out).unwrap();
    let payload = agonquant::rle_encode(&[0xC0; 4]);
    let mut expected = (payload.len() as u32).to_le_bytes().to_vec();
    expected.extend_from_slice(&payload);
    assert_eq!(bytes, expected);
}

#[test]
fn absolute_frames_with_deflate() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("clip.agm");
    let mut source = MemorySource::new(2, 2, frames()).unwrap();
    let config = PipelineConfig::new(2, 2)
        .delta(false)
        .atomic(false)
        .compressor(Arc::new(Deflate::default()));
    video::process(&mut source, &out, &palette(), config).unwrap();

    let player = Player::new(MovieReader::open(&out).unwrap(), 2, 2, false)
        .unwrap()
        .with_compressor(Arc::new(Deflate::default()));
    let played: Vec<Vec<u8>> = player.map(|f| f.unwrap().into_data()).collect();
    assert_eq!(played, expected_rgba2());
}

#[test]
fn truncated_movie_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("clip.agm");
    let mut source = MemorySource::new(2, 2, frames()).unwrap();
    video::process(&mut source, &out, &palette(), PipelineConfig::new(2, 2)).unwrap();

    let mut bytes = std::fs::read(&out).unwrap();
    bytes.pop();
    std::fs::write(&out, &bytes).unwrap();

    let results: Vec<_> = Player::open(&out, 2, 2, true).unwrap().collect();
    assert_eq!(results.len(), 3);
    assert!(results[..2].iter().all(|r| r.is_ok()));
    assert!(matches!(results[2], Err(Error::Truncated { frames: 2 })));
}

#[test]
fn cancelled_run_leaves_no_output() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("clip.agm");
    let mut source = MemorySource::new(2, 2, frames()).unwrap();
    let config = PipelineConfig::new(2, 2).cancel_flag(Arc::new(AtomicBool::new(true)));

    let err = video::process(&mut source, &out, &palette(), config).unwrap_err();
    assert!(matches!(err, Error::Cancelled { frames: 0 }));
    assert!(!out.exists());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn missing_decoder_reports_external_tool() {
    let err = agonquant::source::FfmpegSource::open_with(
        "agonquant-no-such-decoder",
        "clip.mp4",
        4,
        4,
    )
    .err()
    .unwrap();
    assert!(matches!(err, Error::ExternalTool { .. }));
}
