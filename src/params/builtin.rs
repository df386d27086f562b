//! Parameters every manifest knows about without declaring them.

use crate::params::{AggregationMethod, ParameterSpec};

use AggregationMethod as M;

const TABLE: &[(&str, &str, &str, AggregationMethod)] = &[
    ("carbon", "an amount of carbon emitted into the atmosphere", "gCO2e", M::Sum),
    ("core-units", "number of cores available", "cores", M::None),
    ("cpu-util", "refers to CPU utilization", "percentage", M::Avg),
    ("cpu/utilization", "refers to CPU utilization", "percentage", M::Avg),
    ("cpu/energy", "energy consumed by the CPU of the component", "kWh", M::Sum),
    ("cpu/thermal-design-power", "thermal design power for a processor", "W", M::Avg),
    ("disk-io", "GB of data written/read from disk", "GB", M::Sum),
    ("duration", "refers to the duration of the input", "seconds", M::Sum),
    ("energy", "amount of energy utilised by the component", "kWh", M::Sum),
    ("energy-cpu", "energy consumed by the CPU of the component", "kWh", M::Sum),
    ("energy-memory", "energy consumed by the memory of the component", "kWh", M::Sum),
    ("energy-network", "energy consumed by the network of the component", "kWh", M::Sum),
    ("embodied-carbon", "embodied emissions of the component", "gCO2e", M::Sum),
    ("expected-lifespan", "total expected lifespan of the component", "seconds", M::Sum),
    ("functional-unit", "functional unit the SCI value is expressed in", "none", M::Sum),
    ("functional-unit-time", "unit of time for the SCI calculation", "none", M::None),
    ("gpu-util", "refers to GPU utilization", "percentage", M::Avg),
    ("grid-carbon-intensity", "carbon intensity for the grid", "gCO2eq/kWh", M::Avg),
    ("grid/carbon-intensity", "carbon intensity for the grid", "gCO2eq/kWh", M::Avg),
    ("instance-type", "cloud instance name used in the provider APIs", "none", M::None),
    ("cloud/instance-type", "cloud instance name used in the provider APIs", "none", M::None),
    ("cloud/region", "region the cloud instance runs in", "none", M::None),
    ("cloud/vendor", "cloud vendor", "none", M::None),
    ("location", "geographic location of the component", "none", M::None),
    ("memory/energy", "energy consumed by the memory of the component", "kWh", M::Sum),
    ("network/energy", "energy consumed by the network of the component", "kWh", M::Sum),
    ("operational-carbon", "carbon from the component's energy use", "gCO2e", M::Sum),
    ("physical-processor", "processor model name", "none", M::None),
    ("vendor", "hardware or cloud vendor", "none", M::None),
    ("ram-alloc", "GB of memory allocated", "GB", M::Avg),
    ("ram-util", "refers to memory utilization", "percentage", M::Avg),
    ("requests", "number of requests served", "requests", M::Sum),
    ("resources-reserved", "resources reserved for the component", "count", M::None),
    ("resources-total", "total resources available on the host", "count", M::None),
    ("thermal-design-power", "thermal design power for a processor", "W", M::Avg),
    ("total-embodied-emissions", "total embodied emissions of the hardware", "gCO2e", M::Sum),
    ("total-resources", "total resources available on the host", "count", M::None),
    ("timestamp", "time of occurrence of the observation", "RFC3339", M::None),
    ("time-reserved", "time the component was reserved for", "seconds", M::Avg),
];

pub(crate) fn builtin_parameters() -> impl Iterator<Item = ParameterSpec> {
    TABLE
        .iter()
        .map(|(name, description, unit, method)| ParameterSpec {
            name: name.to_string(),
            description: Some(description.to_string()),
            unit: Some(unit.to_string()),
            aggregation_method: *method,
        })
}
