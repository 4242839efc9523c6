//! # Integration Tests
//!
//! End-to-end runs of the curation pipeline over small on-disk fixtures:
//! configuration text goes through the loader, tables and sensor files are
//! written to a temp dir, and the file sink output is read back.

#[cfg(test)]
mod contract_tests {
    use contracts::{BoundaryRegime, Cohort};

    #[test]
    fn test_every_regime_has_a_cohort() {
        for regime in [
            BoundaryRegime::ClinicVisit,
            BoundaryRegime::MotorTask,
            BoundaryRegime::HomeOnOff,
            BoundaryRegime::DiaryCheckpoints,
            BoundaryRegime::SymptomDiary,
        ] {
            assert!(regime.cohort().supports(regime));
            assert!(!regime.label_columns().is_empty());
            assert!(!regime.required_tables().is_empty());
        }
        assert!(!Cohort::CisPd.supports(BoundaryRegime::HomeOnOff));
        // Each cohort has a checkpoint regime its default policy applies to
        for cohort in [Cohort::CisPd, Cohort::RealPd] {
            assert!([BoundaryRegime::SymptomDiary, BoundaryRegime::DiaryCheckpoints]
                .iter()
                .any(|r| cohort.supports(*r) && r.uses_center_points()));
        }
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::fs;
    use std::path::Path;

    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::SkipReason;
    use segment_curator::{CurationPipeline, PipelineConfig, PipelineStats};
    use tempfile::TempDir;

    /// 2019-03-04 09:59:00 UTC
    const DEVICE_TIME_AT_REFERENCE_10AM: i64 = 1_551_693_540;
    /// 2016-05-01 00:00:00 UTC
    const DEVICE_TIME_2016: i64 = 1_462_060_800;

    fn read_csv(path: &Path) -> Vec<Vec<String>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_path(path)
            .unwrap();
        reader
            .records()
            .map(|r| r.unwrap().iter().map(str::to_string).collect())
            .collect()
    }

    fn column(rows: &[Vec<String>], name: &str) -> usize {
        rows[0]
            .iter()
            .position(|c| c == name)
            .unwrap_or_else(|| panic!("column {name} missing from {:?}", rows[0]))
    }

    async fn run(config: &str) -> PipelineStats {
        let blueprint = ConfigLoader::load_from_str(config, ConfigFormat::Toml).unwrap();
        CurationPipeline::new(PipelineConfig { blueprint })
            .run()
            .await
            .unwrap()
    }

    fn clock(seconds_of_day: u32) -> String {
        format!(
            "{:02}:{:02}:{:02}",
            seconds_of_day / 3600,
            (seconds_of_day % 3600) / 60,
            seconds_of_day % 60
        )
    }

    /// Clinic cohort fixtures: task sheet plus reference-clock sensor files.
    fn clinic_fixture(root: &Path) {
        fs::write(
            root.join("motor_tasks.csv"),
            "SubjID,Visit,Task,TaskAbb,Start Timestamp (UTC),Stop Timestamp (UTC)\n\
             1004,Baseline,Drinking,Drnkg,2017-06-01 10:00:00,2017-06-01 10:00:10\n\
             1004,Baseline,Folding,Fldg,2017-06-01 10:01:00,2017-06-01 10:01:05\n\
             1004,Baseline,Sitting,Sitng,2017-06-01 10:02:00,2017-06-01 10:02:00\n\
             1004,Baseline,Typing,Typg,2017-06-01 12:00:00,2017-06-01 12:00:30\n\
             1005,Baseline,Drinking,Drnkg,2017-06-01 11:00:00,2017-06-01 11:00:10\n",
        )
        .unwrap();

        let sensors = root.join("watch_accel");
        fs::create_dir_all(&sensors).unwrap();
        let mut good = String::from("Timestamp,x,y,z\n");
        // 09:59:58 through 10:01:10, one sample per second
        for t in 35_998..=36_070u32 {
            good.push_str(&format!("2017-06-01 {},0.1,0.2,{}\n", clock(t), t % 7));
        }
        fs::write(sensors.join("watch_accel_1004.csv"), good).unwrap();
        fs::write(
            sensors.join("watch_accel_1005.csv"),
            "Timestamp,x,y,z\n2017-06-01 11:00:01,abc,0.2,0.3\n",
        )
        .unwrap();
        // No boundaries for this subject; never opened
        fs::write(sensors.join("watch_accel_2001.csv"), "not,a,sensor,file\n").unwrap();
    }

    fn clinic_config(root: &Path, out: &Path) -> String {
        format!(
            r#"
cohort = "cis_pd"
regime = "motor_task"

[tables.motor_tasks]
path = "{tasks}"

[[sources]]
id = "watch_accel"
dir = "{sensors}"
prefix = "watch_accel"
device = "smartwatch"
measurement = "accelerometer"
time_column = "Timestamp"
time_axis = "datetime"
channels = ["x", "y", "z"]

[output]
dir = "{out}"
pool_size = 2

[[output.sinks]]
name = "log"
sink_type = "log"

[[output.sinks]]
name = "files"
sink_type = "file"
"#,
            tasks = root.join("motor_tasks.csv").display(),
            sensors = root.join("watch_accel").display(),
            out = out.display(),
        )
    }

    /// Home cohort fixtures: export, calibration sheet, device-clock files.
    fn home_fixture(root: &Path) {
        fs::write(
            root.join("home_export.csv"),
            "Record Id,date_screening,OFF_UPDRS_start,OFF_free_living_start,ON_UPDRS_start,ON_free_living_start,\
             Time_interval_1,Time_interval_2,Time_interval_3,Time_interval_4,Time_interval_5,Time_interval_6\n\
             hbv012,04-03-2019,10:00,10:05,14:00,14:05,10:00,,14:00,,,\n\
             hbv013,04-03-2019,09:00,09:30,-99,-99,,11:00,,,,\n",
        )
        .unwrap();
        fs::write(
            root.join("video_device_sync.csv"),
            format!(
                "pat_id,device,video_time,device_time\n\
                 hbv012,Smartwatch,2019-03-04 10:00:00,{DEVICE_TIME_AT_REFERENCE_10AM}\n\
                 hbv014,Smartwatch,2019-03-04 10:00:00,{DEVICE_TIME_2016}\n"
            ),
        )
        .unwrap();

        let sensors = root.join("watch_accel");
        fs::create_dir_all(&sensors).unwrap();
        let mut hbv012 = String::from("device_time,x,y,z\n");
        // Device clock runs 60 s behind: covers 09:57 to 10:03 reference time
        for k in -6..=6i64 {
            let t = DEVICE_TIME_AT_REFERENCE_10AM + k * 30;
            hbv012.push_str(&format!("{t},{k},0.5,-0.5\n"));
        }
        fs::write(sensors.join("watch_accel_hbv012.csv"), hbv012).unwrap();
        fs::write(
            sensors.join("watch_accel_hbv013.csv"),
            format!("device_time,x,y,z\n{DEVICE_TIME_AT_REFERENCE_10AM},1,2,3\n"),
        )
        .unwrap();
    }

    fn home_config(root: &Path, out: &Path, regime: &str) -> String {
        format!(
            r#"
cohort = "real_pd"
regime = "{regime}"

[tables.home_timestamps]
path = "{export}"

[tables.video_device_sync]
path = "{sync}"

[alignment]
center_radius_s = 120.0

[[sources]]
id = "watch_accel"
dir = "{sensors}"
prefix = "watch_accel"
device = "smartwatch"
measurement = "accelerometer"
time_column = "device_time"
time_axis = "seconds"
channels = ["x", "y", "z"]

[output]
dir = "{out}"

[[output.sinks]]
name = "files"
sink_type = "file"
"#,
            export = root.join("home_export.csv").display(),
            sync = root.join("video_device_sync.csv").display(),
            sensors = root.join("watch_accel").display(),
            out = out.display(),
        )
    }

    #[tokio::test]
    async fn test_motor_task_run() {
        let root = TempDir::new().unwrap();
        let out = root.path().join("out");
        clinic_fixture(root.path());

        let stats = run(&clinic_config(root.path(), &out)).await;
        let run = &stats.metrics.run;

        assert_eq!(run.boundaries_resolved, 4);
        assert_eq!(run.boundary_discards.get("non_positive_duration"), 1);
        assert_eq!(run.files_loaded, 1, "subject 2001 has no boundaries");
        assert_eq!(run.files_failed, 1, "bad channel value in subject 1005");
        assert_eq!(run.segments_emitted, 2);
        assert_eq!(run.skipped(SkipReason::NoMatchingSamples), 1);
        assert_eq!(stats.active_sinks, 2);
        assert_eq!(stats.rows, 4);

        let segments = read_csv(&out.join("segments.csv"));
        assert_eq!(segments.len(), 5);
        let task = column(&segments, "task");
        let pivot = column(&segments, "smartwatch_accelerometer");
        for row in &segments[1..] {
            match row[task].as_str() {
                "Drinking" if row[1] == "1004" => {
                    let samples = read_csv(&out.join(&row[pivot]));
                    assert_eq!(samples[0], vec!["time", "x", "y", "z"]);
                    assert_eq!(samples.len(), 1 + 11, "inclusive 10 s window at 1 Hz");
                    assert_eq!(samples[1][0].parse::<f64>().unwrap(), 0.0);
                }
                "Folding" => assert!(row[pivot].starts_with("segments/")),
                _ => assert_eq!(row[pivot], "", "no data for {:?}", row),
            }
        }
    }

    #[tokio::test]
    async fn test_segment_ids_join_back_to_boundaries() {
        let root = TempDir::new().unwrap();
        let out = root.path().join("out");
        clinic_fixture(root.path());
        run(&clinic_config(root.path(), &out)).await;

        let boundaries = read_csv(&out.join("boundaries.csv"));
        let segments = read_csv(&out.join("segments.csv"));
        let task_code = column(&boundaries, "task_code");
        assert_eq!(column(&segments, "task_code"), task_code, "labels line up");

        for row in &segments[1..] {
            let boundary = boundaries[1..]
                .iter()
                .find(|b| b[0] == row[0])
                .expect("every segment id is a boundary id");
            assert_eq!(boundary[1], row[1]);
            assert_eq!(boundary[task_code], row[task_code]);
        }
        let drinking = boundaries[1..]
            .iter()
            .find(|b| b[1] == "1004" && b[task_code] == "drnkg")
            .unwrap();
        assert_eq!(drinking[column(&boundaries, "duration_s")], "10.000");
    }

    #[tokio::test]
    async fn test_home_on_off_offset_alignment() {
        let root = TempDir::new().unwrap();
        let out = root.path().join("out");
        home_fixture(root.path());

        let stats = run(&home_config(root.path(), &out, "home_on_off")).await;
        let run = &stats.metrics.run;

        assert_eq!(run.references_resolved, 1);
        assert_eq!(run.reference_discards.get("before_recording_epoch"), 1);
        // hbv012 off and on, hbv013 off only
        assert_eq!(run.boundaries_resolved, 3);
        assert_eq!(run.skipped(SkipReason::MissingReference), 1);
        assert_eq!(run.files_loaded, 1, "hbv013 has no reference and is never read");
        assert_eq!(run.streams_aligned, 1);

        let references = read_csv(&out.join("time_references.csv"));
        assert_eq!(references[0], vec!["subject_id", "device", "offset_s"]);
        assert_eq!(references[1], vec!["hbv012", "smartwatch", "60.000000"]);

        let segments = read_csv(&out.join("segments.csv"));
        let state = column(&segments, "state");
        let pivot = column(&segments, "smartwatch_accelerometer");
        let off = segments[1..]
            .iter()
            .find(|r| r[1] == "hbv012" && r[state] == "off")
            .unwrap();
        let samples = read_csv(&out.join(&off[pivot]));
        // 10:00:00 to 10:03:00 reference time at 30 s spacing
        assert_eq!(samples.len(), 1 + 7);
        assert_eq!(samples[1][1], "0");

        let on = segments[1..]
            .iter()
            .find(|r| r[1] == "hbv012" && r[state] == "on")
            .unwrap();
        assert_eq!(on[pivot], "", "interval without samples stays absent");
        for row in segments[1..].iter().filter(|r| r[1] == "hbv013") {
            assert_eq!(row[pivot], "", "unaligned subject contributes nothing");
        }
    }

    #[tokio::test]
    async fn test_diary_keeps_checkpoint_rows() {
        let root = TempDir::new().unwrap();
        let out = root.path().join("out");
        home_fixture(root.path());

        let stats = run(&home_config(root.path(), &out, "diary_checkpoints")).await;
        let run = &stats.metrics.run;

        // hbv012 records slots 1 and 3, hbv013 slot 2
        assert_eq!(run.boundaries_resolved, 3);
        assert_eq!(run.reserved_slots, 9);
        assert_eq!(run.null_segments, 1, "slot 3 has no samples");
        assert_eq!(run.segments_emitted, 1, "null payloads are counted apart");

        let boundaries = read_csv(&out.join("boundaries.csv"));
        assert_eq!(boundaries.len(), 1 + 3, "only recorded checkpoints are boundaries");
        let center = column(&boundaries, "center_time");
        assert!(boundaries[1..].iter().all(|b| !b[center].is_empty()));

        let segments = read_csv(&out.join("segments.csv"));
        assert_eq!(segments.len(), 1 + 12, "every slot of a kept row has a row");
        let interval = column(&segments, "interval");
        let pivot = column(&segments, "smartwatch_accelerometer");

        for row in segments[1..].iter().filter(|r| r[1] == "hbv012") {
            if row[interval] == "1" {
                let samples = read_csv(&out.join(&row[pivot]));
                // 09:58 to 10:02 reference time
                assert_eq!(samples.len(), 1 + 9);
            } else {
                assert_eq!(row[pivot], "null", "slot {} keeps a null row", row[interval]);
            }
        }
        for row in segments[1..].iter().filter(|r| r[1] == "hbv013") {
            let expected = if row[interval] == "2" { "" } else { "null" };
            assert_eq!(row[pivot], expected, "slot {}", row[interval]);
        }
    }

    fn write_samples(path: &Path, date: &str, seconds_of_day: impl Iterator<Item = u32>) {
        let mut text = String::from("Timestamp,x,y,z\n");
        for t in seconds_of_day {
            text.push_str(&format!("{date} {},{t},0.0,1.0\n", clock(t)));
        }
        fs::write(path, text).unwrap();
    }

    /// Clinic cohort config over one table and one `w_`-prefixed source.
    fn cis_config(
        regime: &str,
        table: (&str, &Path),
        sensors: &Path,
        layout: &str,
        out: &Path,
    ) -> String {
        format!(
            r#"
cohort = "cis_pd"
regime = "{regime}"

[tables.{table_kind}]
path = "{table_path}"

[[sources]]
id = "watch_accel"
dir = "{sensors}"
prefix = "w"
device = "smartwatch"
measurement = "accelerometer"
file_layout = "{layout}"
channels = ["x", "y", "z"]

[output]
dir = "{out}"

[[output.sinks]]
name = "files"
sink_type = "file"
"#,
            table_kind = table.0,
            table_path = table.1.display(),
            sensors = sensors.display(),
            out = out.display(),
        )
    }

    #[tokio::test]
    async fn test_task_across_month_files_is_whole() {
        let root = TempDir::new().unwrap();
        let out = root.path().join("out");
        let tasks = root.path().join("motor_tasks.csv");
        fs::write(
            &tasks,
            "SubjID,Visit,Task,TaskAbb,Start Timestamp (UTC),Stop Timestamp (UTC)\n\
             1004,Baseline,Drinking,Drnkg,2017-06-30 23:59:50,2017-07-01 00:00:10\n\
             1004,Baseline,Folding,Fldg,2017-06-30 23:59:42,2017-06-30 23:59:45\n",
        )
        .unwrap();
        let sensors = root.path().join("watch");
        fs::create_dir_all(&sensors).unwrap();
        write_samples(&sensors.join("w_1004_2017-06.csv"), "2017-06-30", 86_380..86_400);
        write_samples(&sensors.join("w_1004_2017-07.csv"), "2017-07-01", 0..20);

        let config = cis_config(
            "motor_task",
            ("motor_tasks", &tasks),
            &sensors,
            "subject_year_month",
            &out,
        );
        let stats = run(&config).await;
        let run = &stats.metrics.run;
        assert_eq!(run.files_loaded, 2);
        assert_eq!(run.streams_aligned, 1, "monthly pieces form one stream");
        assert_eq!(run.segments_emitted, 2);
        assert_eq!(run.no_match_skips, 0);

        let segments = read_csv(&out.join("segments.csv"));
        let task = column(&segments, "task");
        let pivot = column(&segments, "smartwatch_accelerometer");
        let drinking = segments[1..].iter().find(|r| r[task] == "Drinking").unwrap();
        let samples = read_csv(&out.join(&drinking[pivot]));
        assert_eq!(samples.len(), 1 + 21, "23:59:50 through 00:00:10 at 1 Hz");
        assert_eq!(samples[1][0].parse::<f64>().unwrap(), 0.0);
        assert_eq!(samples[21][0].parse::<f64>().unwrap(), 20.0);

        let folding = segments[1..].iter().find(|r| r[task] == "Folding").unwrap();
        assert_eq!(read_csv(&out.join(&folding[pivot])).len(), 1 + 4);
    }

    #[tokio::test]
    async fn test_symptom_diary_run() {
        let root = TempDir::new().unwrap();
        let out = root.path().join("out");
        let diary = root.path().join("diary.csv");
        fs::write(
            &diary,
            "SubjID,Timestamp,Reported Timestamp,Measurement Name,Value\n\
             1004,2017-06-01 10:00:00,2017-06-01 10:30:00,On/Off,1\n\
             1004,2017-06-01 10:00:00,2017-06-01 11:00:00,Tremor,3\n\
             1004,2017-06-01 10:00:00,2017-06-01 10:30:00,Tremor,2\n\
             1004,2017-06-01 15:00:00,2017-06-01 15:05:00,Dyskinesia,1\n",
        )
        .unwrap();
        let sensors = root.path().join("watch");
        fs::create_dir_all(&sensors).unwrap();
        // 09:45 through 10:15, one sample per minute
        write_samples(
            &sensors.join("w_1004.csv"),
            "2017-06-01",
            (0..=30).map(|m| 35_100 + m * 60),
        );

        let config = cis_config(
            "symptom_diary",
            ("symptom_diary", &diary),
            &sensors,
            "subject",
            &out,
        );
        let stats = run(&config).await;
        let run = &stats.metrics.run;
        assert_eq!(run.boundaries_resolved, 2);
        assert_eq!(run.boundary_discards.get("superseded_report"), 1);
        assert_eq!(run.segments_emitted, 1);
        assert_eq!(run.no_match_skips, 1, "15:00 entry has no samples");
        assert_eq!(run.null_segments, 0, "cis_pd drops unmatched checkpoints");

        let segments = read_csv(&out.join("segments.csv"));
        assert_eq!(segments.len(), 1 + 2);
        let pivot = column(&segments, "smartwatch_accelerometer");
        let on_off = column(&segments, "on_off");
        let tremor = column(&segments, "tremor");
        let dyskinesia = column(&segments, "dyskinesia");
        let morning = segments[1..].iter().find(|r| r[on_off] == "1").unwrap();
        assert_eq!(morning[tremor], "3", "latest report wins");
        assert_eq!(morning[dyskinesia], "");
        let samples = read_csv(&out.join(&morning[pivot]));
        assert_eq!(samples.len(), 1 + 21, "ten minutes either side at one per minute");
        assert_eq!(samples[1][0].parse::<f64>().unwrap(), 0.0);

        let afternoon = segments[1..].iter().find(|r| r[dyskinesia] == "1").unwrap();
        assert_eq!(afternoon[pivot], "");

        let boundaries = read_csv(&out.join("boundaries.csv"));
        assert!(boundaries[0].contains(&"center_time".to_string()));
    }

    #[tokio::test]
    async fn test_missing_source_dir_fails_run() {
        let root = TempDir::new().unwrap();
        let out = root.path().join("out");
        clinic_fixture(root.path());
        fs::remove_dir_all(root.path().join("watch_accel")).unwrap();

        let blueprint =
            ConfigLoader::load_from_str(&clinic_config(root.path(), &out), ConfigFormat::Toml)
                .unwrap();
        let result = CurationPipeline::new(PipelineConfig { blueprint }).run().await;
        let message = format!("{:#}", result.unwrap_err());
        assert!(message.contains("watch_accel"), "got {message}");
    }

    #[test]
    fn test_cohort_regime_mismatch_rejected() {
        let root = TempDir::new().unwrap();
        let out = root.path().join("out");
        let config = clinic_config(root.path(), &out).replace("cis_pd", "real_pd");
        assert!(ConfigLoader::load_from_str(&config, ConfigFormat::Toml).is_err());
    }

    #[tokio::test]
    async fn test_summary_json_written() {
        let root = TempDir::new().unwrap();
        let out = root.path().join("out");
        clinic_fixture(root.path());
        run(&clinic_config(root.path(), &out)).await;

        let summary: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(out.join("summary.json")).unwrap()).unwrap();
        assert_eq!(summary["boundaries_resolved"], 4);
        assert_eq!(summary["files_failed"], 1);
    }
}
