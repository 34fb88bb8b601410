/// Test helper: compare serialized output line by line, with a readable
/// diff on mismatch.
pub fn assert_lines(output: &str, expected: &[&str]) {
    let got: Vec<&str> = output.lines().collect();
    assert_eq!(
        got.len(),
        expected.len(),
        "line count mismatch {} != {}, output={:?}",
        got.len(),
        expected.len(),
        got,
    );
    for (index, (g, e)) in got.iter().zip(expected.iter()).enumerate() {
        assert_eq!(g, e, "line {} differs", index + 1);
    }
}
