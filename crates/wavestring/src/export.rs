//! CSV export of string profiles.

use std::io::Write;

use crate::error::Result;
use crate::simulation::SimulationRegistry;

/// Write the current displacement of every instance as CSV.
///
/// One record per node: the node position `x`, then one column per
/// instance in stepping order (`primary`, then `row-N` for each simulated
/// row).
pub fn write_profile<W: Write>(registry: &SimulationRegistry, writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);

    let instances: Vec<_> = registry.instances().collect();
    let mut header = vec!["x".to_string()];
    header.extend(instances.iter().map(|i| i.id().to_string()));
    wtr.write_record(&header)?;

    let params = registry.params();
    for node in 0..params.node_count() {
        let mut record = vec![params.node_position(node).to_string()];
        record.extend(instances.iter().map(|i| i.current()[node].to_string()));
        wtr.write_record(&record)?;
    }

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::ParameterInputs;

    #[test]
    fn test_profile_columns() {
        let mut registry =
            SimulationRegistry::from_inputs(ParameterInputs::default().with_node_count(5)).unwrap();
        let row = registry.add_row();
        registry.apply_expression(row, "0.5").unwrap();
        registry.set_simulated(row, true).unwrap();
        registry.step_all().unwrap();

        let mut buffer = Vec::new();
        write_profile(&registry, &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 6);
        assert_eq!(lines[0], format!("x,primary,{}", row));
        assert_eq!(lines[1], "0,0.5,0.5");
        assert_eq!(lines[5], "1,0,0");
    }
}
