use crate::upstream::{Station, StationParameter};
use serde_json::{Value, json};

/// Station directory payload.
///
/// The upstream swaps `ID` and `name`; they are swapped back here.
pub fn stations_to_json(stations: &[Station]) -> Value {
    let stations: Vec<Value> = stations.iter().map(station_to_json).collect();
    json!({ "Stations": stations })
}

fn station_to_json(station: &Station) -> Value {
    let location = &station.metadata.location;
    let parameters: Vec<Value> = station.parameters.iter().map(parameter_to_json).collect();

    json!({
        "ID": station.name,
        "name": station.id,
        "metadata": {
            "dateEstablished": station.metadata.date_established,
            "location": {
                "lat": location.lat,
                "long": location.long,
                "state": location.state,
            },
        },
        "parameters": parameters,
    })
}

fn parameter_to_json(parameter: &StationParameter) -> Value {
    json!({
        "name": parameter.name,
        "dcp": parameter.dcp,
        "sensorID": parameter.sensor_id,
        "status": parameter.status,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::{StationLocation, StationMetadata};

    #[test]
    fn test_swaps_id_and_name_back() {
        let station = Station {
            id: "Seattle".to_string(),
            name: "9447130".to_string(),
            metadata: StationMetadata {
                date_established: "1899-01-01".to_string(),
                location: StationLocation {
                    lat: 47.6026,
                    long: -122.3393,
                    state: "WA".to_string(),
                },
            },
            parameters: vec![StationParameter {
                name: "Water Level".to_string(),
                dcp: 1,
                sensor_id: "A1".to_string(),
                status: 1,
            }],
        };

        let body = stations_to_json(&[station]);
        let entry = &body["Stations"][0];

        assert_eq!(entry["ID"], "9447130");
        assert_eq!(entry["name"], "Seattle");
        assert_eq!(entry["metadata"]["location"]["state"], "WA");
        assert_eq!(entry["metadata"]["dateEstablished"], "1899-01-01");
        assert_eq!(entry["parameters"][0]["sensorID"], "A1");
        let keys: Vec<_> = entry.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, ["ID", "name", "metadata", "parameters"]);
    }

    #[test]
    fn test_empty_directory() {
        assert_eq!(stations_to_json(&[]), json!({ "Stations": [] }));
    }
}
