mod pipeline_loop {
    use anyhow::Result;
    use image::{Rgb, RgbImage, RgbaImage};
    use segmatte::output::PresentationSink;
    use segmatte::pipeline::pass_through;
    use segmatte::segmentation::{MaskSequence, SegmentationProvider};
    use segmatte::source::{FrameSource, ImageSequence, Orientation};
    use segmatte::{run_pipeline, Mask, PipelineOptions};

    #[derive(Default)]
    struct Collect {
        frames: Vec<RgbaImage>,
    }

    impl PresentationSink for Collect {
        fn present(&mut self, frame: &RgbaImage) -> Result<()> {
            self.frames.push(frame.clone());
            Ok(())
        }

        fn resolution(&self) -> Option<(u32, u32)> {
            None
        }
    }

    /// Returns a mask only on even frames
    struct EveryOther {
        calls: u64,
    }

    impl SegmentationProvider for EveryOther {
        fn segment(&mut self, _frame: &RgbImage) -> Result<Option<Mask>> {
            self.calls += 1;
            if self.calls % 2 == 1 {
                Ok(Some(Mask::filled(1, 1, 0.0)?))
            } else {
                Ok(None)
            }
        }

        fn name(&self) -> &str {
            "every-other"
        }
    }

    fn frames() -> Vec<RgbImage> {
        (0..3)
            .map(|i| RgbImage::from_pixel(4, 3, Rgb([i * 50, 100, 200])))
            .collect()
    }

    fn options(max_frames: u64) -> PipelineOptions {
        PipelineOptions {
            fps: 0,
            max_frames: Some(max_frames),
            ..PipelineOptions::default()
        }
    }

    #[test]
    fn without_provider_every_frame_is_passed_through() {
        let mut source = ImageSequence::from_frames(frames(), Orientation::Up).unwrap();
        let mut sink = Collect::default();

        let stats = run_pipeline(&mut source, &mut sink, None, &options(5)).unwrap();

        assert_eq!(stats.frames, 5);
        assert_eq!(stats.passed_through, 5);
        assert_eq!(sink.frames.len(), 5);
        let expected = frames();
        for (i, frame) in sink.frames.iter().enumerate() {
            assert_eq!(frame, &pass_through(&expected[i % 3]));
        }
        assert_eq!(source.loops_completed(), 1);
    }

    #[test]
    fn missing_masks_fall_back_per_frame() {
        let mut source = ImageSequence::from_frames(frames(), Orientation::Up).unwrap();
        let mut sink = Collect::default();
        let provider: Box<dyn SegmentationProvider> = Box::new(EveryOther { calls: 0 });

        let stats = run_pipeline(&mut source, &mut sink, Some(provider), &options(4)).unwrap();

        assert_eq!(stats.composited, 2);
        assert_eq!(stats.passed_through, 2);
        assert_eq!(stats.segmentation_failures, 0);
        let alphas: Vec<u8> = sink.frames.iter().map(|f| f.get_pixel(0, 0)[3]).collect();
        assert_eq!(alphas, vec![0, 255, 0, 255]);
    }

    #[test]
    fn switched_off_segmentation_never_calls_provider() {
        let mut source = ImageSequence::from_frames(frames(), Orientation::Up).unwrap();
        let mut sink = Collect::default();
        let masks = MaskSequence::from_masks(vec![Mask::filled(2, 2, 0.0).unwrap()]).unwrap();

        let opts = PipelineOptions {
            segmentation_enabled: false,
            ..options(3)
        };
        let stats = run_pipeline(&mut source, &mut sink, Some(Box::new(masks)), &opts).unwrap();

        assert_eq!(stats.passed_through, 3);
        assert!(sink.frames.iter().all(|f| f.pixels().all(|p| p[3] == 255)));
    }

    #[test]
    fn mask_sequence_composites_at_frame_size() {
        let mut source = ImageSequence::from_frames(frames(), Orientation::Right).unwrap();
        let (width, height) = source.resolution();
        let mut sink = Collect::default();
        let masks = MaskSequence::from_masks(vec![
            Mask::from_raw(2, 1, vec![1.0, 1.0]).unwrap(),
            Mask::filled(5, 5, 0.5).unwrap(),
        ])
        .unwrap();

        let stats = run_pipeline(&mut source, &mut sink, Some(Box::new(masks)), &options(2)).unwrap();

        assert_eq!(stats.composited, 2);
        assert_eq!(sink.frames[0].dimensions(), (width, height));
        assert!(sink.frames[0].pixels().all(|p| p[3] == 255 && p[1] == 100));
        assert!(sink.frames[1].pixels().all(|p| p[3] == 128 && p[2] == 200));
    }

    #[test]
    fn masks_stay_in_step_with_frames_across_loops() {
        let mut source = ImageSequence::from_frames(frames(), Orientation::Up).unwrap();
        let mut sink = Collect::default();
        let masks = MaskSequence::from_masks(vec![
            Mask::filled(1, 1, 0.0).unwrap(),
            Mask::filled(1, 1, 1.0).unwrap(),
        ])
        .unwrap();

        let stats = run_pipeline(&mut source, &mut sink, Some(Box::new(masks)), &options(9)).unwrap();
        assert_eq!(stats.composited, 9);

        let mask_alpha = [0u8, 255];
        for (i, frame) in sink.frames.iter().enumerate() {
            let index_in_pass = i % 3;
            assert_eq!(frame.get_pixel(0, 0)[0], index_in_pass as u8 * 50);
            assert_eq!(
                frame.get_pixel(0, 0)[3],
                mask_alpha[index_in_pass % 2],
                "frame {index_in_pass} of pass {}",
                i / 3
            );
        }
    }

    #[test]
    fn matte_mode_presents_grey() {
        let mut source = ImageSequence::from_frames(frames(), Orientation::Up).unwrap();
        let mut sink = Collect::default();
        let masks = MaskSequence::from_masks(vec![Mask::filled(1, 1, 1.0).unwrap()]).unwrap();

        let opts = PipelineOptions {
            show_matte: true,
            ..options(1)
        };
        let stats = run_pipeline(&mut source, &mut sink, Some(Box::new(masks)), &opts).unwrap();

        assert_eq!(stats.mattes, 1);
        assert!(sink.frames[0].pixels().all(|p| p.0 == [255, 255, 255, 255]));
    }
}
