//! Lets the optimiser expand the transmission grid.
use super::ScenarioStep;
use crate::network::Network;
use anyhow::Result;
use log::info;
use serde::Deserialize;

/// Makes every link (and optionally every line) extendable
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TransmissionExpander {
    /// Whether AC lines are made extendable too
    #[serde(default)]
    pub include_lines: bool,
}

impl ScenarioStep for TransmissionExpander {
    fn name(&self) -> &'static str {
        "transmission"
    }

    /// Only the extendable flags change; capacity bounds come from the model.
    fn apply(&self, mut network: Network) -> Result<Network> {
        for link in network.links.iter_mut() {
            link.p_nom_extendable = true;
        }
        if self.include_lines {
            for line in network.lines.iter_mut() {
                line.s_nom_extendable = true;
            }
        }
        info!(
            "Made {} links{} extendable",
            network.links.len(),
            if self.include_lines { " and lines" } else { "" }
        );

        Ok(network)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::network;
    use crate::network::component::Line;
    use rstest::rstest;

    #[rstest]
    fn test_expand_links_only(mut network: Network) {
        network.lines.upsert(Line {
            name: "line_A_C".into(),
            bus0: "bus_A".into(),
            bus1: "bus_C".into(),
            s_nom: 50.0,
            ..Line::default()
        });
        let mut expected = network.clone();
        for link in expected.links.iter_mut() {
            link.p_nom_extendable = true;
        }

        let network = TransmissionExpander::default().apply(network).unwrap();
        assert_eq!(network, expected);
        assert!(!network.lines.get("line_A_C").unwrap().s_nom_extendable);
    }

    #[rstest]
    fn test_expand_lines(mut network: Network) {
        network.lines.upsert(Line {
            name: "line_A_C".into(),
            bus0: "bus_A".into(),
            bus1: "bus_C".into(),
            ..Line::default()
        });
        let expander = TransmissionExpander {
            include_lines: true,
        };
        let network = expander.apply(network).unwrap();
        assert!(network.lines.get("line_A_C").unwrap().s_nom_extendable);
        assert!(network.links.iter().all(|link| link.p_nom_extendable));
    }
}
