//! End-to-end tests of the `cisgrn` command line tool on the fixtures in
//! `tests_data/`. None of these need the FIMO binary.

use cisgrn::test_utilities::{cisgrn_binary_path, temp_file_with_suffix};
use std::fs;
use std::path::Path;
use std::process::{Command, Output};

fn cisgrn(args: &[&str]) -> Output {
    Command::new(cisgrn_binary_path())
        .args(args)
        .output()
        .expect("cisgrn failed to run")
}

fn stdout_of(output: &Output) -> String {
    assert!(
        output.status.success(),
        "cisgrn failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout.clone()).unwrap()
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn test_background_selection() {
    let dir = tempfile::tempdir().unwrap();
    let ids = dir.path().join("background_ids.txt");
    let fasta = dir.path().join("background_promoters.fa");
    let output = cisgrn(&[
        "background",
        "tests_data/expression.tsv",
        "--cluster",
        "3",
        "--promoters",
        "tests_data/promoters.fa",
        "--ids-out",
        path_str(&ids),
        "--fasta-out",
        path_str(&fasta),
    ]);
    stdout_of(&output);

    // each cluster 3 gene has an exact average-expression match
    assert_eq!(
        fs::read_to_string(&ids).unwrap(),
        "AT1G01020.1\nAT1G01040.1\n"
    );
    let promoters = fs::read_to_string(&fasta).unwrap();
    let headers: Vec<&str> = promoters.lines().filter(|l| l.starts_with('>')).collect();
    assert_eq!(headers, vec![">AT1G01020", ">AT1G01040.1"]);
}

#[test]
fn test_background_unknown_cluster() {
    let dir = tempfile::tempdir().unwrap();
    let output = cisgrn(&[
        "background",
        "tests_data/expression.tsv",
        "--cluster",
        "42",
        "--promoters",
        "tests_data/promoters.fa",
        "--ids-out",
        path_str(&dir.path().join("ids.txt")),
        "--fasta-out",
        path_str(&dir.path().join("bg.fa")),
    ]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Error:"));
    assert!(stderr.contains("Foreground (cluster 42) is empty"));
}

#[test]
fn test_promoter_extraction() {
    let gene_ids = temp_file_with_suffix(".txt");
    fs::write(gene_ids.path(), "AT1G01050.1\nnot a gene\nAT2G01010\nAT4G00001\n").unwrap();
    let output = cisgrn(&[
        "promoters",
        path_str(gene_ids.path()),
        "--promoters",
        "tests_data/promoters.fa",
    ]);
    let fasta = stdout_of(&output);
    assert_eq!(
        fasta,
        ">AT1G01050\nTATATAAACACGTGGCCACGTGAATTCCGGAATTCC\n\
         >AT2G01010\nCACGTGACGTCATTTAAAGGGCCCTTTGGGAA\n"
    );
}

#[test]
fn test_annotate_hits() {
    let output = cisgrn(&[
        "annotate",
        "tests_data/fimo_foreground.tsv",
        "--promoters",
        "tests_data/promoters.fa",
        "--gff",
        "tests_data/genes.gff3",
    ]);
    let csv = stdout_of(&output);
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 9);
    assert_eq!(
        lines[0],
        "Motif_ID,Gene_ID,Hit_Start,Hit_Stop,Hit_Strand,Promoter_Sequence,Chromosome,Gene_Start,Gene_Stop,Gene_Strand"
    );
    assert_eq!(
        lines[1],
        "MA0001.1,AT1G01010,3,12,+,ACGTACGTAAGGCCTTACGTATATAAACGTACGT,Chr1,3631,5899,+"
    );
    // AT1G01030.1 in FIMO is looked up by its locus
    assert!(lines[5].starts_with("MA0001.1,AT1G01030,1,10,+,CCAAATTTGGG"));
    assert!(lines[5].ends_with(",Chr1,11649,13714,-"));
}

#[test]
fn test_enrichment() {
    let dir = tempfile::tempdir().unwrap();
    let table = dir.path().join("enrichment.csv");
    let enriched = dir.path().join("enriched_ids.txt");
    let output = cisgrn(&[
        "enrich",
        "--foreground",
        "tests_data/fimo_foreground.tsv",
        "--background",
        "tests_data/fimo_background.tsv",
        "--output",
        path_str(&table),
        "--enriched-ids",
        path_str(&enriched),
    ]);
    stdout_of(&output);

    let contents = fs::read_to_string(&table).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(
        lines[0],
        "Motif,Foreground_Count,Background_Count,Odds_Ratio,P_Value,Adj_P_Value"
    );
    assert_eq!(lines.len(), 4);
    assert!(lines[1].starts_with("MA0001.1,5,1,"));
    assert!(lines[2].starts_with("MA0005.2,2,2,"));
    assert!(lines[3].starts_with("MA0020.1,1,3,"));
    // these counts are far too small for anything to survive correction
    assert_eq!(fs::read_to_string(&enriched).unwrap(), "");
}

#[test]
fn test_shuffle_and_empirical() {
    let dir = tempfile::tempdir().unwrap();
    let control = dir.path();
    let output = cisgrn(&[
        "shuffle",
        "tests_data/promoters.fa",
        "--control-dir",
        path_str(control),
        "--rounds",
        "2",
        "--seed",
        "666",
        "--skip-fimo",
    ]);
    stdout_of(&output);
    for round in 0..2 {
        let shuffled = fs::read_to_string(control.join(format!("shuffled_{}.fa", round))).unwrap();
        assert!(shuffled.starts_with(">AT1G01010_shuffled\n"));
        assert_eq!(shuffled.lines().count(), 12);
    }

    // stand in for FIMO
    fs::create_dir_all(control.join("fimo_real")).unwrap();
    fs::copy(
        "tests_data/fimo_foreground.tsv",
        control.join("fimo_real/fimo.tsv"),
    )
    .unwrap();
    for round in 0..2 {
        let fimo_dir = control.join(format!("fimo_shuffled_{}", round));
        fs::create_dir_all(&fimo_dir).unwrap();
        fs::copy("tests_data/fimo_background.tsv", fimo_dir.join("fimo.tsv")).unwrap();
    }

    let output = cisgrn(&["empirical", path_str(control), "--rounds", "3"]);
    let csv = stdout_of(&output);
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(
        lines[0],
        "motif_id,Real_Score_Sum,Shuffled_Mean_Score,P_Value,Adjusted_P,Score_Difference,Significant"
    );
    assert_eq!(lines.len(), 4);
    // MA0001.1: five real hits against one hit of 7.6 in both rounds
    let fields: Vec<&str> = lines[1].split(',').collect();
    assert_eq!(fields[0], "MA0001.1");
    let real: f64 = fields[1].parse().unwrap();
    assert!((real - 51.3).abs() < 1e-9);
    assert_eq!(fields[2], "7.6");
    // round 2 is missing, leaving two null values below the real sum
    let p_value: f64 = fields[3].parse().unwrap();
    assert!((p_value - 1.0 / 3.0).abs() < 1e-12);
    assert_eq!(fields[6], "False");
}

#[test]
fn test_shuffle_needs_motifs() {
    let dir = tempfile::tempdir().unwrap();
    let output = cisgrn(&[
        "shuffle",
        "tests_data/promoters.fa",
        "--control-dir",
        path_str(dir.path()),
        "--rounds",
        "1",
    ]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("--skip-fimo"));
}

#[test]
fn test_empirical_without_controls() {
    let dir = tempfile::tempdir().unwrap();
    let output = cisgrn(&[
        "empirical",
        path_str(dir.path()),
        "--real",
        "tests_data/fimo_foreground.tsv",
    ]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("No shuffled control"));
}

#[test]
fn test_infer_network() {
    let output = cisgrn(&[
        "infer",
        "tests_data/expression.tsv",
        "--tfs",
        "tests_data/tf_list.tsv",
        "--strip-versions",
        "--threads",
        "2",
    ]);
    let tsv = stdout_of(&output);
    let mut lines = tsv.lines();
    assert_eq!(lines.next(), Some("TF\ttarget\timportance"));
    let tfs = ["AT1G01010", "AT1G01030", "AT1G01060"];
    let mut last = f64::INFINITY;
    for line in lines {
        let fields: Vec<&str> = line.split('\t').collect();
        assert_eq!(fields.len(), 3);
        assert!(tfs.contains(&fields[0]));
        assert_ne!(fields[0], fields[1]);
        let importance: f64 = fields[2].parse().unwrap();
        assert!(importance > 0.0 && importance <= last);
        last = importance;
    }
}

#[test]
fn test_infer_versioned_tfs_do_not_match() {
    // expression IDs lose their version suffix, so versioned TF IDs match nothing
    let output = cisgrn(&[
        "infer",
        "tests_data/expression.tsv",
        "--tfs",
        "tests_data/tf_list.tsv",
    ]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("No usable transcription factors"));
}

#[test]
fn test_perturb_and_rank() {
    let output = cisgrn(&["perturb", "tests_data/network.tsv", "--top", "4"]);
    let csv = stdout_of(&output);
    assert_eq!(
        csv,
        "Removed_TF,Original_Degree,num_components,avg_path_length,largest_component_size\n\
         HUB1,4,4,,6\n\
         HUB2,4,4,,4\n\
         G6,2,2,,7\n\
         TF3,2,2,,8\n"
    );

    let perturbation = temp_file_with_suffix(".csv");
    fs::write(perturbation.path(), &csv).unwrap();
    let output = cisgrn(&["rank", path_str(perturbation.path()), "--top", "2"]);
    let ranked = stdout_of(&output);
    let highlights: Vec<&str> = ranked
        .lines()
        .skip(1)
        .map(|l| l.rsplit(',').next().unwrap())
        .collect();
    assert_eq!(highlights, vec!["Top 2", "Top 2", "Other", "Other"]);
}

#[test]
fn test_perturb_threshold() {
    // nothing survives a threshold above every importance
    let output = cisgrn(&["perturb", "tests_data/network.tsv", "--threshold", "100"]);
    let csv = stdout_of(&output);
    assert_eq!(
        csv,
        "Removed_TF,Original_Degree,num_components,avg_path_length,largest_component_size\n"
    );
}

#[test]
fn test_no_subcommand() {
    let output = cisgrn(&[]);
    assert!(!output.status.success());
}
