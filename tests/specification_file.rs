#![warn(clippy::pedantic)]

use std::fs;
use std::path::PathBuf;

use approx::assert_relative_eq;
use trusscalc::{
    analyse_file, find_file, parse_spec, render, render_all, AnalysisError, AppConfig, Diagram,
    Error, ModelConfig, SolverSettings, Summary,
};

fn sample_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("data")
        .join("especificacoes.txt")
}

#[test]
fn sample_is_found_by_name() {
    let data = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data");
    assert_eq!(find_file("especificacoes.txt", &data), Some(sample_path()));
}

#[test]
fn braced_frame_matches_method_of_joints() {
    let model = analyse_file(sample_path(), &AppConfig::default()).expect("sample solves");
    let output = render(&model).expect("model solved");

    assert_eq!(
        output.lines().collect::<Vec<_>>(),
        vec![
            "-10.0; -13.3",
            "0.0; 13.3",
            "0.0; 0.0; 0.0",
            "10.0; 13.3; 16.7",
            "0.0; 0.0; 0.0",
            "0.0; -13.3; -13.3",
            "10.0; 0.0; -10.0",
        ]
    );
}

#[test]
fn external_work_equals_strain_energy() {
    let model = analyse_file(sample_path(), &AppConfig::default()).expect("sample solves");
    let truss = model.truss();

    let external: f64 = truss
        .joints()
        .map(|joint| {
            let load = truss.joint_load(joint).unwrap();
            let displacement = truss.joint_displacement(joint).unwrap();
            load.x * displacement.x + load.y * displacement.y
        })
        .sum();
    let internal: f64 = truss
        .members()
        .map(|member| {
            let axial_force = truss.member_axial_force(member).unwrap();
            let length = truss.member_length(member).unwrap();
            let rigidity = truss.member_rigidity(member).unwrap();
            axial_force * axial_force * length / rigidity
        })
        .sum();

    assert_relative_eq!(internal, 0.48, epsilon = 1.0e-9);
    assert_relative_eq!(external, internal, epsilon = 1.0e-9);

    let loaded = model.joint(3).expect("D is a joint");
    let displacement = truss.joint_displacement(loaded).unwrap();
    assert_relative_eq!(displacement.x, 0.048, epsilon = 1.0e-9);
}

#[test]
fn reactions_balance_applied_loads() {
    let model = analyse_file(sample_path(), &AppConfig::default()).expect("sample solves");
    let summary = Summary::from_model(&model).expect("model solved");

    let (mut sum_x, mut sum_y) = (0.0, 0.0);
    for node in &summary.nodes {
        sum_x += node.load.x + node.reaction.x;
        sum_y += node.load.y + node.reaction.y;
    }
    assert_relative_eq!(sum_x, 0.0, epsilon = 1.0e-9);
    assert_relative_eq!(sum_y, 0.0, epsilon = 1.0e-9);
}

#[test]
fn rigidity_scales_displacements_but_not_forces() {
    let stiff = AppConfig {
        model: ModelConfig {
            default_rigidity: 50_000.0,
            ..ModelConfig::default()
        },
        ..AppConfig::default()
    };
    let soft = analyse_file(sample_path(), &AppConfig::default()).expect("sample solves");
    let stiff = analyse_file(sample_path(), &stiff).expect("sample solves");

    assert_eq!(render(&soft).unwrap(), render(&stiff).unwrap());
    let d = soft.joint(3).unwrap();
    assert_relative_eq!(
        soft.truss().joint_displacement(d).unwrap().x,
        10.0 * stiff.truss().joint_displacement(d).unwrap().x,
        epsilon = 1.0e-9
    );
}

#[test]
fn diagrams_are_written_to_the_output_directory() {
    let model = analyse_file(sample_path(), &AppConfig::default()).expect("sample solves");
    let out = tempfile::tempdir().expect("temporary directory");
    let dir = out.path().join("out");

    let written = render_all(&model, &dir, &AppConfig::default().plot).expect("diagrams written");
    assert_eq!(written.len(), Diagram::ALL.len());
    for diagram in Diagram::ALL {
        let document = fs::read_to_string(dir.join(diagram.file_name())).expect("diagram exists");
        assert!(document.starts_with("<svg"));
        assert!(document.trim_end().ends_with("</svg>"));
        assert!(document.contains(diagram.title()));
    }
}

#[test]
fn malformed_file_reports_parse_error() {
    let dir = tempfile::tempdir().expect("temporary directory");
    let path = dir.path().join("especificacoes.txt");
    fs::write(&path, "2; 1\nA; 0; 0\n").expect("write file");

    let error = analyse_file(&path, &AppConfig::default()).expect_err("truncated input");
    assert!(matches!(error, Error::Parse(_)));
    assert!(error.to_string().contains("line 3"));
}

#[test]
fn unstable_structure_reports_singular_stiffness() {
    // Two rollers along Y cannot resist the horizontal load.
    let text = "3; 3\nA; 0; 0\nB; 4; 0\nC; 2; 2\n0; 1; 1\n1; 0; 1\n1; 1; 0\n0; 0\n0; 0\n5; 0\nY\nY\nL\n";
    let mut model = parse_spec(text)
        .expect("valid description")
        .build(&ModelConfig::default())
        .expect("valid model");
    let error = model
        .solve(&SolverSettings::default())
        .expect_err("mechanism rejected");
    assert_eq!(error, AnalysisError::SingularStiffness);
}

#[test]
fn configuration_file_overrides_defaults() {
    let dir = tempfile::tempdir().expect("temporary directory");
    let path = dir.path().join("trusscalc.json");
    fs::write(
        &path,
        r#"{ "spec_file_name": "truss.txt", "write_plots": false, "plot": { "width": 400 } }"#,
    )
    .expect("write file");

    let config = AppConfig::from_path(&path).expect("valid configuration");
    assert_eq!(config.spec_file_name, "truss.txt");
    assert!(!config.write_plots);
    assert_eq!(config.plot.width, 400.0);
    assert_eq!(config.solver, SolverSettings::default());
}
