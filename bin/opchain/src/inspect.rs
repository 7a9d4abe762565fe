//! Human readable summaries of a state document.

use comfy_table::{Table, presets::UTF8_FULL};
use opchain_deploy::{Addresses, DeploymentState};

fn chain_ids<V>(map: &std::collections::BTreeMap<u64, V>) -> String {
    map.keys()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// One row per pipeline stage, with whether it has completed.
pub fn stages_table(state: &DeploymentState) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Stage", "Status", "Details"]);

    let intent = &state.intent;
    table.add_row(vec![
        "intent".to_string(),
        "done".to_string(),
        format!(
            "L1 {} / L2 {}, fault proofs: {}, alt-DA: {}",
            intent.l1_chain_id, intent.l2_chain_id, intent.use_fault_proofs, intent.use_alt_da
        ),
    ]);

    let (status, details) = match &state.deploy_config {
        Some(config) => (
            "done",
            format!("L1 starting block {}", config.l1_starting_block_tag),
        ),
        None => ("pending", String::new()),
    };
    table.add_row(vec!["configure".to_string(), status.to_string(), details]);

    let (status, details) = match &state.addresses {
        Some(addresses) => {
            let deployed = addresses
                .entries()
                .iter()
                .filter(|(_, address)| !address.is_zero())
                .count();
            ("done", format!("{deployed} contracts"))
        }
        None => ("pending", String::new()),
    };
    table.add_row(vec!["deploy".to_string(), status.to_string(), details]);

    let (status, details) = match (&state.genesis_files, &state.rollup_configs) {
        (Some(files), Some(_)) => ("done", format!("chains {}", chain_ids(files))),
        _ => ("pending", String::new()),
    };
    table.add_row(vec!["genesis".to_string(), status.to_string(), details]);

    table
}

/// Every deployed contract, zero addresses omitted.
pub fn addresses_table(addresses: &Addresses) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Contract", "Address"]);

    for (name, address) in addresses.entries() {
        if !address.is_zero() {
            table.add_row(vec![name.to_string(), address.to_string()]);
        }
    }
    table
}

#[cfg(test)]
mod tests {
    use opchain_deploy::ChainIntent;

    use super::*;

    #[test]
    fn test_fresh_state_has_pending_stages() {
        let state = DeploymentState::new(ChainIntent::new(1, 42));
        let rendered = stages_table(&state).to_string();

        assert!(rendered.contains("L1 1 / L2 42"));
        assert_eq!(rendered.matches("pending").count(), 3);
    }

    #[test]
    fn test_addresses_table_skips_zero_entries() {
        let addresses = Addresses {
            optimism_portal_proxy: "0x0000000000000000000000000000000000000011"
                .parse()
                .expect("address"),
            ..Default::default()
        };

        let rendered = addresses_table(&addresses).to_string();
        assert!(rendered.contains("OptimismPortalProxy"));
        assert!(!rendered.contains("SystemConfigProxy"));
    }
}
