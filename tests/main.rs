use voice_features::analyzer::VoiceAnalyzer;
use voice_features::audio::{samples_from_bytes, ByteOrder};
use voice_features::config::{AnalyzerConfig, FastPitchConfig, FormantConfig, HnrConfig};
use voice_features::debug_audio::{DebugAudioSink, WavDebugSink};
use voice_features::detector::fast::{process_stream, FastPitchEstimator};
use voice_features::detector::fusion::{correct_octave, PitchCandidateSet, PitchFusion, PitchSource};
use voice_features::detector::{PitchEstimate, PitchMethod};
use voice_features::float::Float;
use voice_features::formant::FormantExtractor;
use voice_features::hnr::HnrAnalyzer;
use voice_features::report::{from_json, to_json, AnalysisReport, AnalysisResult};
use voice_features::utils::buffer::new_real_buffer;
use voice_features::vad::detect_voice_activity;
use voice_features::Error;

const SAMPLE_RATE: usize = 22050;
const SIZE: usize = 1024;
/// Spectrum bin width of a frame, and the frequency step of one zero crossing in a
/// 512 sample chunk. Both come to 21.5 Hz.
const STEP_HZ: f64 = SAMPLE_RATE as f64 / SIZE as f64;

const SWEEP: [f64; 13] = [
    65.0, 80.0, 100.0, 120.0, 150.0, 200.0, 220.0, 300.0, 440.0, 600.0, 880.0, 950.0, 1000.0,
];

#[test]
fn autocorrelation_sin_signal() {
    for freq in SWEEP {
        pure_frequency(PitchMethod::Autocorrelation, "sin", freq, 0.06);
    }
}

#[test]
fn autocorrelation_low_voices() {
    let estimator = estimator::<f64>();
    for freq in [65.0, 80.0, 100.0] {
        let estimate = estimator.pitch_with_confidence(&sin_wave(freq, SIZE, SAMPLE_RATE));
        assert!(estimate.voiced, "{freq}");
        assert!((estimate.frequency - freq).abs() < freq * 0.06, "{freq}: {estimate:?}");
    }

    let frames: Vec<Vec<f64>> = [65.0, 100.0]
        .iter()
        .map(|&f| sin_wave(f, SIZE, SAMPLE_RATE))
        .collect();
    for (pitch, freq) in estimator.process_stream(&frames).into_iter().zip([65.0, 100.0]) {
        assert!((pitch - freq).abs() < freq * 0.06, "{freq}: got {pitch}");
    }
}

#[test]
fn autocorrelation_square_signal() {
    for freq in [220.0, 440.0] {
        pure_frequency(PitchMethod::Autocorrelation, "square", freq, 0.06);
    }
}

#[test]
fn hps_sin_signal() {
    for freq in [150.0, 220.0, 300.0, 440.0, 880.0] {
        pure_frequency(PitchMethod::HarmonicProductSpectrum, "sin", freq, 0.1);
    }
}

#[test]
fn hps_sweep_is_within_one_bin() {
    // 64.6 Hz is the last bin under `min_freq`, so 65 Hz lands on the next one.
    for freq in SWEEP {
        quantized_frequency(PitchMethod::HarmonicProductSpectrum, freq);
    }
}

#[test]
fn zero_crossing_sin_signal() {
    for freq in [150.0, 220.0, 300.0, 440.0, 880.0] {
        pure_frequency(PitchMethod::ZeroCrossing, "sin", freq, 0.1);
    }
}

#[test]
fn zero_crossing_sweep_is_within_one_crossing() {
    for freq in &SWEEP[..SWEEP.len() - 1] {
        quantized_frequency(PitchMethod::ZeroCrossing, *freq);
    }

    // 47 crossings read as 1012 Hz, which is above `max_freq`.
    let pitch = estimator::<f64>().zero_crossing_pitch(&sin_wave(1000.0, SIZE, SAMPLE_RATE));
    assert!(pitch == 0.0 || (pitch - 1000.0).abs() <= STEP_HZ, "got {pitch}");
}

#[test]
fn f32_and_f64_agree() {
    let estimator32 = estimator::<f32>();
    let estimator64 = estimator::<f64>();
    let pitch32 = estimator32.autocorrelation_pitch(&sin_wave::<f32>(440.0, SIZE, SAMPLE_RATE));
    let pitch64 = estimator64.autocorrelation_pitch(&sin_wave::<f64>(440.0, SIZE, SAMPLE_RATE));
    assert_eq!(pitch32 as f64, pitch64);
}

#[test]
fn silence_has_no_pitch() {
    let estimator = estimator::<f64>();
    let zeros = vec![0.0; SIZE];
    // A quiet tone: standard deviation well below 0.01.
    let whisper: Vec<f64> = sin_wave::<f64>(440.0, SIZE, SAMPLE_RATE).iter().map(|s| s * 0.005).collect();

    for signal in [&zeros, &whisper] {
        for method in [
            PitchMethod::Autocorrelation,
            PitchMethod::HarmonicProductSpectrum,
            PitchMethod::ZeroCrossing,
        ] {
            assert_eq!(estimator.get_pitch(signal, method), 0.0, "{method:?}");
        }
        let estimate = estimator.pitch_with_confidence(signal);
        assert_eq!(estimate, PitchEstimate::unvoiced());
        assert_eq!(estimate.confidence, 0.0);
        assert!(!estimate.voiced);
    }
}

#[test]
fn constant_offset_is_silence() {
    let estimator = estimator::<f64>();
    let offset = vec![0.7; SIZE];
    assert_eq!(estimator.get_pitch(&offset, PitchMethod::Autocorrelation), 0.0);
    assert_eq!(estimator.get_pitch(&offset, PitchMethod::ZeroCrossing), 0.0);
}

#[test]
fn stream_keeps_frame_order() {
    let frames: Vec<Vec<f64>> = [220.0, 440.0, 880.0]
        .iter()
        .map(|&f| sin_wave(f, SIZE, SAMPLE_RATE))
        .chain(std::iter::once(vec![0.0; SIZE]))
        .collect();

    let pitches = process_stream(&frames, SAMPLE_RATE as f64).unwrap();
    assert_eq!(pitches.len(), 4);
    for (pitch, expected) in pitches.iter().zip([220.0, 440.0, 880.0]) {
        assert!((pitch - expected).abs() < expected * 0.06);
    }
    assert_eq!(pitches[3], 0.0);

    let analyzer = VoiceAnalyzer::<f64>::new(AnalyzerConfig::default()).unwrap();
    assert_eq!(analyzer.process_stream(&frames), pitches);

    assert!(matches!(
        process_stream::<f64, _>(&frames, 0.0),
        Err(Error::Configuration(_))
    ));
}

#[test]
fn voice_activity_gate() {
    let voiced: Vec<f32> = sin_wave(200.0, 2048, SAMPLE_RATE);
    assert!(detect_voice_activity(&voiced, 0.001));
    assert!(!detect_voice_activity(&vec![0.0f32; 2048], 0.001));
    assert!(!detect_voice_activity(&voiced[..50], 0.001));

    let analyzer = VoiceAnalyzer::<f32>::new(AnalyzerConfig::default()).unwrap();
    assert!(analyzer.detect_voice_activity(&voiced));
    // A loud 5 kHz tone crosses zero far too often to be voice.
    assert!(!analyzer.detect_voice_activity(&sin_wave::<f32>(5000.0, 2048, SAMPLE_RATE)));
}

#[test]
fn octave_correction_is_deterministic() {
    let bands = AnalyzerConfig::default().fusion.octave_bands;
    assert_eq!(correct_octave(440.0, &bands), 220.0);
    assert_eq!(correct_octave(220.0, &bands), 110.0);
    assert_eq!(correct_octave(880.0, &bands), 880.0);

    let fusion = PitchFusion::new(&AnalyzerConfig::default().fusion);
    let candidates: PitchCandidateSet = [
        (PitchSource::Yin, 440.0),
        (PitchSource::Piptrack, 220.0),
        (PitchSource::Autocorrelation, 880.0),
    ]
    .into_iter()
    .collect();
    let runs: Vec<u64> = (0..5).map(|_| fusion.fuse(&candidates).to_bits()).collect();
    assert!(runs.iter().all(|&bits| bits == runs[0]));
    assert_eq!(f64::from_bits(runs[0]), 220.0);
}

#[test]
fn fused_pitch_of_a_steady_tone() {
    let signal: Vec<f64> = sin_wave(150.0, SAMPLE_RATE, SAMPLE_RATE);
    let fusion = PitchFusion::new(&AnalyzerConfig::default().fusion);

    let candidates = fusion.candidates(&signal, SAMPLE_RATE as f64);
    assert_eq!(candidates.len(), 3);
    let pitch = fusion.fuse(&candidates);
    assert!((pitch - 150.0).abs() < 150.0 * 0.05, "got {pitch}");
}

#[test]
fn formants_of_two_resonances() {
    let signal = vowel(SAMPLE_RATE, 8000);
    let extractor = FormantExtractor::new(FormantConfig::default());
    let formants = extractor.extract(&signal, SAMPLE_RATE as f64);

    assert!(!formants.is_empty());
    assert!(formants.len() <= 4);
    assert!(formants.windows(2).all(|w| w[0] <= w[1]));
    assert!(formants.iter().all(|&f| 300.0 < f && f < 4000.0));
    for resonance in [700.0, 1200.0] {
        assert!(
            formants.iter().any(|f| (f - resonance).abs() < resonance * 0.1),
            "no formant near {resonance} in {formants:?}"
        );
    }

    let two = FormantExtractor::new(FormantConfig {
        count: 2,
        ..FormantConfig::default()
    });
    assert_eq!(two.extract(&signal, SAMPLE_RATE as f64), formants[..2].to_vec());
}

#[test]
fn hnr_of_a_pure_tone_is_high() {
    let analyzer = HnrAnalyzer::new(HnrConfig::default());
    let hnr = analyzer.analyze(&sin_wave::<f64>(300.0, SAMPLE_RATE, SAMPLE_RATE));
    assert!(hnr > 20.0, "got {hnr}");
}

#[test]
fn hnr_of_white_noise_is_low() {
    let analyzer = HnrAnalyzer::new(HnrConfig::default());
    let hnr = analyzer.analyze(&white_noise(SAMPLE_RATE, 7));
    assert!(hnr < 0.5, "got {hnr}");
}

#[test]
fn utterance_analysis_is_idempotent() {
    let analyzer = VoiceAnalyzer::<f32>::new(AnalyzerConfig::default()).unwrap();
    let signal: Vec<f32> = vowel(SAMPLE_RATE, SAMPLE_RATE)
        .iter()
        .zip(white_noise(SAMPLE_RATE, 3))
        .map(|(v, n)| (v + 0.01 * n) as f32)
        .collect();

    let first = analyzer.analyze_utterance(&signal).unwrap();
    let second = analyzer.analyze_utterance(&signal).unwrap();
    assert_eq!(first.pitch_hz.to_bits(), second.pitch_hz.to_bits());
    assert_eq!(first.hnr_db.to_bits(), second.hnr_db.to_bits());
    assert_eq!(first.formants, second.formants);

    assert!(first.formants.len() <= 4);
    assert!(first.formants.iter().all(|&f| 300.0 < f && f < 4000.0));
}

#[test]
fn no_pitch_and_failure_stay_distinct() {
    let analyzer = VoiceAnalyzer::<f32>::new(AnalyzerConfig::default()).unwrap();

    let silent = analyzer.analyze_report(&vec![0.0; 4096]);
    match &silent {
        AnalysisReport::Success(result) => assert_eq!(result.pitch_hz, 0.0),
        other => panic!("silence is not a failure: {other:?}"),
    }

    let failed = analyzer.analyze_report(&[]);
    assert!(!failed.is_success());
    let json = to_json(&failed).unwrap();
    assert!(json.contains("\"error\""));
    assert!(!json.contains("pitch_hz"));
}

#[test]
fn analysis_result_round_trips_through_json() {
    let result = AnalysisResult {
        pitch_hz: 147.83729183719283,
        formants: vec![731.7012345678901, 1203.2000000000003, 2641.5],
        hnr_db: 17.000000000000004,
    };
    let report = AnalysisReport::Success(result);
    let parsed = from_json(&to_json(&report).unwrap()).unwrap();
    assert_eq!(parsed, report);
}

#[test]
fn bytes_are_decoded_in_declared_order() {
    let signal: Vec<f32> = sin_wave(220.0, 4096, SAMPLE_RATE);
    let little: Vec<u8> = signal.iter().flat_map(|s| s.to_le_bytes()).collect();
    let big: Vec<u8> = signal.iter().flat_map(|s| s.to_be_bytes()).collect();

    assert_eq!(samples_from_bytes(&little, ByteOrder::Little).unwrap(), signal);
    assert_eq!(samples_from_bytes(&big, ByteOrder::Big).unwrap(), signal);

    let analyzer = VoiceAnalyzer::<f32>::new(AnalyzerConfig::default()).unwrap();
    assert_eq!(
        analyzer.analyze_bytes(&little, ByteOrder::Little, None),
        analyzer.analyze_bytes(&big, ByteOrder::Big, None)
    );
}

#[test]
fn debug_sink_writes_a_float_wav() {
    let dir = tempfile::tempdir().unwrap();
    let sink = WavDebugSink::new(dir.path()).with_prefix("take_");
    let signal: Vec<f32> = sin_wave(220.0, 2048, 16000);

    let path = sink.persist(&signal, 16000).unwrap();
    let name = path.file_name().unwrap().to_str().unwrap();
    assert!(name.starts_with("take_") && name.ends_with(".wav"));

    let mut reader = hound::WavReader::open(&path).unwrap();
    let spec = reader.spec();
    assert_eq!(spec.channels, 1);
    assert_eq!(spec.sample_rate, 16000);
    assert_eq!(spec.bits_per_sample, 32);
    assert_eq!(spec.sample_format, hound::SampleFormat::Float);
    let samples: Vec<f32> = reader.samples::<f32>().map(|s| s.unwrap()).collect();
    assert_eq!(samples, signal);
}

#[test]
fn analyzer_persists_through_its_sink() {
    let dir = tempfile::tempdir().unwrap();
    let sink = WavDebugSink::new(dir.path());
    let analyzer = VoiceAnalyzer::<f32>::new(AnalyzerConfig::default()).unwrap();
    let bytes: Vec<u8> = sin_wave::<f32>(220.0, 4096, SAMPLE_RATE)
        .iter()
        .flat_map(|s| s.to_le_bytes())
        .collect();

    let report = analyzer.analyze_bytes(&bytes, ByteOrder::Little, Some(&sink));
    assert!(report.is_success());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn configuration_from_toml() {
    let config = AnalyzerConfig::from_toml_str(
        r#"
        sample_rate = 44100.0
        frame_size = 2048

        [fast]
        min_freq = 80.0

        [[fusion.octave_bands]]
        low = 100.0
        high = 200.0
        score = 1
        "#,
    )
    .unwrap();
    assert_eq!(config.frame_size, 2048);
    assert_eq!(config.fast.min_freq, 80.0);
    assert_eq!(config.fast.max_freq, FastPitchConfig::default().max_freq);
    assert_eq!(config.fusion.octave_bands.len(), 1);

    let text = config.to_toml_string().unwrap();
    assert_eq!(AnalyzerConfig::from_toml_str(&text).unwrap(), config);

    assert!(matches!(
        AnalyzerConfig::from_toml_str("frame_size = 0"),
        Err(Error::Configuration(_))
    ));
    assert!(matches!(
        AnalyzerConfig::from_toml_str("frame_size = \"large\""),
        Err(Error::ConfigParse(_))
    ));
}

fn pure_frequency(method: PitchMethod, wave_name: &str, freq: f64, tolerance: f64) {
    let signal: Vec<f64> = match wave_name {
        "sin" => sin_wave(freq, SIZE, SAMPLE_RATE),
        "square" => square_wave(freq, SIZE, SAMPLE_RATE),
        _ => panic!("Unknown wave type {}", wave_name),
    };

    let pitch = estimator::<f64>().get_pitch(&signal, method);

    println!("{:?}: expected {}, detected {}", method, freq, pitch);
    assert!(
        (pitch - freq).abs() < freq * tolerance,
        "{:?} on a {} wave: expected {}, detected {}",
        method,
        wave_name,
        freq,
        pitch
    );
}

/// Coarse methods resolve a frequency to one `STEP_HZ` step. From 10 steps up that
/// is also within 10%.
fn quantized_frequency(method: PitchMethod, freq: f64) {
    let pitch = estimator::<f64>().get_pitch(&sin_wave(freq, SIZE, SAMPLE_RATE), method);
    assert!(
        (pitch - freq).abs() <= STEP_HZ,
        "{:?}: expected {}, detected {}",
        method,
        freq,
        pitch
    );
    if freq >= 10.0 * STEP_HZ {
        assert!((pitch - freq).abs() < freq * 0.1);
    }
}

fn estimator<T: Float>() -> FastPitchEstimator<T> {
    FastPitchEstimator::new(SAMPLE_RATE as f64, SIZE, FastPitchConfig::default()).unwrap()
}

fn sin_wave<T: Float>(freq: f64, size: usize, sample_rate: usize) -> Vec<T> {
    let mut signal = new_real_buffer(size);
    let two_pi = 2.0 * std::f64::consts::PI;
    let dx = two_pi * freq / sample_rate as f64;
    for i in 0..size {
        let x = i as f64 * dx;
        let y = 0.5 * x.sin();
        signal[i] = T::from(y).unwrap();
    }
    signal
}

fn square_wave<T: Float>(freq: f64, size: usize, sample_rate: usize) -> Vec<T> {
    let mut signal = new_real_buffer(size);
    let period = sample_rate as f64 / freq;

    for i in 0..size {
        let x = i as f64 / period;
        let frac = x - x.floor();
        let y = match frac >= 0.5 {
            true => -0.5,
            false => 0.5,
        };
        signal[i] = T::from(y).unwrap();
    }
    signal
}

/// Uniform noise in `[-0.5, 0.5)` from a fixed-seed linear congruential generator.
fn white_noise(size: usize, seed: u64) -> Vec<f64> {
    let mut state = seed;
    (0..size)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            (state >> 33) as f64 / (1u64 << 31) as f64 - 0.5
        })
        .collect()
}

/// A 150 Hz pulse train through resonances at 700 Hz and 1200 Hz.
fn vowel(sample_rate: usize, size: usize) -> Vec<f64> {
    let source: Vec<f64> = (0..size)
        .map(|n| if n % 147 == 0 { 1.0 } else { 0.0 })
        .collect();
    let first = resonator(&source, 700.0, 80.0, sample_rate as f64);
    resonator(&first, 1200.0, 100.0, sample_rate as f64)
}

fn resonator(input: &[f64], freq: f64, bandwidth: f64, sample_rate: f64) -> Vec<f64> {
    let r = (-std::f64::consts::PI * bandwidth / sample_rate).exp();
    let theta = 2.0 * std::f64::consts::PI * freq / sample_rate;
    let (a1, a2) = (-2.0 * r * theta.cos(), r * r);
    let mut output = vec![0.0; input.len()];
    for n in 0..input.len() {
        let y1 = if n >= 1 { output[n - 1] } else { 0.0 };
        let y2 = if n >= 2 { output[n - 2] } else { 0.0 };
        output[n] = input[n] - a1 * y1 - a2 * y2;
    }
    output
}
