use super::xml::XmlNode;
use super::{
    HighLowDay, HighLowRecord, PredictionRecord, RawRecord, Result, Station, StationLocation,
    StationMetadata, StationParameter, Upstream, UpstreamError, UpstreamParams, VerifiedRecord,
};
use crate::config::UpstreamConfig;
use async_trait::async_trait;
use quick_xml::escape::escape;
use reqwest::Client;
use std::fmt::Write as _;

const NAMESPACE_ROOT: &str = "https://opendap.co-ops.nos.noaa.gov/axis/webservices";

/// One SOAP operation on one CO-OPS endpoint.
struct Service {
    endpoint: &'static str,
    namespace: &'static str,
    operation: &'static str,
}

const ACTIVE_STATIONS: Service = Service {
    endpoint: "ActiveStations",
    namespace: "activestations",
    operation: "getActiveStations",
};

const WATER_LEVEL_VERIFIED: Service = Service {
    endpoint: "WaterLevelVerifiedSixMin",
    namespace: "waterlevelverifiedsixmin",
    operation: "getWaterLevelVerifiedSixMin",
};

const WATER_LEVEL_RAW: Service = Service {
    endpoint: "WaterLevelRawSixMin",
    namespace: "waterlevelrawsixmin",
    operation: "getWaterLevelRawSixMin",
};

const PREDICTIONS: Service = Service {
    endpoint: "Predictions",
    namespace: "predictions",
    operation: "getPredictions",
};

const HIGH_LOW: Service = Service {
    endpoint: "HighLowTidePred",
    namespace: "highlowtidepred",
    operation: "getHighLowTidePredictions",
};

/// CO-OPS SOAP client. One POST per call, no retries.
#[derive(Debug, Clone)]
pub struct SoapUpstream {
    client: Client,
    base_url: String,
}

impl SoapUpstream {
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        let mut builder = Client::builder().user_agent(config.user_agent.clone());
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }

        let client = builder
            .build()
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn call(&self, service: &Service, params: Option<&UpstreamParams>) -> Result<XmlNode> {
        let url = format!("{}/{}", self.base_url, service.endpoint);
        let envelope = envelope(service, params);

        tracing::debug!(url = %url, operation = service.operation, "Calling upstream");

        let response = self
            .client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "text/xml; charset=utf-8")
            .header("SOAPAction", "\"\"")
            .body(envelope)
            .send()
            .await
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;

        // Faults arrive as HTTP 500 with a SOAP body; prefer the fault text.
        let root = XmlNode::parse(&body);
        if let Ok(root) = &root
            && let Some(fault) = root.find("Fault")
        {
            let message = fault
                .child_text("faultstring")
                .unwrap_or("unspecified fault")
                .to_string();
            return Err(UpstreamError::Fault(message));
        }

        if !status.is_success() {
            return Err(UpstreamError::Status {
                status: status.as_u16(),
            });
        }

        root
    }
}

fn envelope(service: &Service, params: Option<&UpstreamParams>) -> String {
    let mut body = String::new();

    if let Some(p) = params {
        let _ = write!(
            body,
            "<tns:stationId>{}</tns:stationId>\
             <tns:beginDate>{}</tns:beginDate>\
             <tns:endDate>{}</tns:endDate>\
             <tns:datum>{}</tns:datum>\
             <tns:unit>{}</tns:unit>\
             <tns:timeZone>{}</tns:timeZone>",
            escape(p.station_id.as_str()),
            escape(p.begin_date.as_str()),
            escape(p.end_date.as_str()),
            escape(p.datum.as_str()),
            p.unit,
            p.time_zone,
        );
        if let Some(interval) = p.data_interval {
            let _ = write!(body, "<tns:dataInterval>{interval}</tns:dataInterval>");
        }
    }

    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
         <soapenv:Envelope xmlns:soapenv=\"http://schemas.xmlsoap.org/soap/envelope/\" \
         xmlns:tns=\"{NAMESPACE_ROOT}/{ns}/wsdl\">\
         <soapenv:Body><tns:{op}>{body}</tns:{op}></soapenv:Body>\
         </soapenv:Envelope>",
        ns = service.namespace,
        op = service.operation,
    )
}

fn data_items<'a>(root: &'a XmlNode) -> Result<impl Iterator<Item = &'a XmlNode>> {
    let data = root
        .find("data")
        .ok_or_else(|| UpstreamError::Decode("response has no <data> element".to_string()))?;
    Ok(data.children_named("item"))
}

pub(crate) fn decode_stations(root: &XmlNode) -> Result<Vec<Station>> {
    let stations = root
        .find("stations")
        .ok_or_else(|| UpstreamError::Decode("response has no <stations> element".to_string()))?;

    stations
        .children_named("station")
        .map(|station| {
            let metadata = station.child("metadata").ok_or_else(|| {
                UpstreamError::Decode("station is missing <metadata>".to_string())
            })?;
            let location = metadata.child("location").ok_or_else(|| {
                UpstreamError::Decode("station is missing <location>".to_string())
            })?;

            let parameters = station
                .children_named("parameter")
                .map(|p| {
                    Ok(StationParameter {
                        name: p.required_text("name")?,
                        dcp: p.parse_value("DCP")?,
                        sensor_id: p.required_text("sensorID")?,
                        status: p.parse_value("status")?,
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            Ok(Station {
                id: station.required_text("ID")?,
                name: station.required_text("name")?,
                metadata: StationMetadata {
                    date_established: metadata.required_text("date_established")?,
                    location: StationLocation {
                        lat: location.parse_value("lat")?,
                        long: location.parse_value("long")?,
                        state: location.value("state").unwrap_or_default().to_string(),
                    },
                },
                parameters,
            })
        })
        .collect()
}

pub(crate) fn decode_verified(root: &XmlNode) -> Result<Vec<VerifiedRecord>> {
    data_items(root)?
        .map(|item| {
            Ok(VerifiedRecord {
                timestamp: item.required_text("timeStamp")?,
                water_level: item.parse_value("WL")?,
                sigma: item.parse_value("sigma")?,
                inferred: item.parse_value("I")?,
                flat_tolerance: item.parse_value("F")?,
                rate_of_change: item.parse_value("R")?,
                temperature: item.parse_value("T")?,
            })
        })
        .collect()
}

pub(crate) fn decode_raw(root: &XmlNode) -> Result<Vec<RawRecord>> {
    data_items(root)?
        .map(|item| {
            Ok(RawRecord {
                timestamp: item.required_text("timeStamp")?,
                water_level: item.parse_value("WL")?,
                sigma: item.parse_value("sigma")?,
                outside_three_sigma: item.parse_value("O")?,
                flat_tolerance: item.parse_value("F")?,
                rate_of_change: item.parse_value("R")?,
                limit_exceeded: item.parse_value("L")?,
            })
        })
        .collect()
}

pub(crate) fn decode_predictions(root: &XmlNode) -> Result<Vec<PredictionRecord>> {
    data_items(root)?
        .map(|item| {
            Ok(PredictionRecord {
                timestamp: item.required_text("timeStamp")?,
                prediction: item.parse_value("pred")?,
            })
        })
        .collect()
}

pub(crate) fn decode_high_low(root: &XmlNode) -> Result<Vec<HighLowDay>> {
    let values = root
        .find("HighLowValues")
        .and_then(|outer| outer.child("HighLowValues").or(Some(outer)))
        .ok_or_else(|| {
            UpstreamError::Decode("response has no <HighLowValues> element".to_string())
        })?;

    values
        .children_named("item")
        .map(|day| {
            let extrema = day
                .children_named("data")
                .map(|d| {
                    Ok(HighLowRecord {
                        time: d.required_text("time")?,
                        prediction: d.parse_value("pred")?,
                        kind: d.required_text("type")?,
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            Ok(HighLowDay {
                date: day.required_text("date")?,
                extrema,
            })
        })
        .collect()
}

#[async_trait]
impl Upstream for SoapUpstream {
    async fn active_stations(&self) -> Result<Vec<Station>> {
        let root = self.call(&ACTIVE_STATIONS, None).await?;
        decode_stations(&root)
    }

    async fn water_level_verified(&self, params: &UpstreamParams) -> Result<Vec<VerifiedRecord>> {
        let root = self.call(&WATER_LEVEL_VERIFIED, Some(params)).await?;
        decode_verified(&root)
    }

    async fn water_level_raw(&self, params: &UpstreamParams) -> Result<Vec<RawRecord>> {
        let root = self.call(&WATER_LEVEL_RAW, Some(params)).await?;
        decode_raw(&root)
    }

    async fn predictions(&self, params: &UpstreamParams) -> Result<Vec<PredictionRecord>> {
        let root = self.call(&PREDICTIONS, Some(params)).await?;
        decode_predictions(&root)
    }

    async fn high_low_predictions(&self, params: &UpstreamParams) -> Result<Vec<HighLowDay>> {
        let root = self.call(&HIGH_LOW, Some(params)).await?;
        decode_high_low(&root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> UpstreamParams {
        UpstreamParams::builder()
            .station_id("94<47130")
            .begin_date("20200101")
            .end_date("20200101")
            .data_interval(6)
            .build()
    }

    #[test]
    fn test_client_builds_with_and_without_timeout() {
        let unbounded = UpstreamConfig {
            base_url: "http://localhost:8089/axis/services/".to_string(),
            ..UpstreamConfig::default()
        };
        assert_eq!(unbounded.request_timeout(), None);
        let upstream = SoapUpstream::new(&unbounded).unwrap();
        assert_eq!(upstream.base_url, "http://localhost:8089/axis/services");

        let bounded = UpstreamConfig {
            timeout_secs: Some(10),
            ..UpstreamConfig::default()
        };
        assert!(SoapUpstream::new(&bounded).is_ok());
    }

    #[test]
    fn test_envelope_escapes_and_includes_interval() {
        let xml = envelope(&PREDICTIONS, Some(&params()));
        assert!(xml.contains("<tns:getPredictions>"));
        assert!(xml.contains("/predictions/wsdl"));
        assert!(xml.contains("<tns:stationId>94&lt;47130</tns:stationId>"));
        assert!(xml.contains("<tns:dataInterval>6</tns:dataInterval>"));
        assert!(xml.contains("<tns:datum>MLLW</tns:datum>"));
    }

    #[test]
    fn test_envelope_without_params() {
        let xml = envelope(&ACTIVE_STATIONS, None);
        assert!(xml.contains("<tns:getActiveStations></tns:getActiveStations>"));
    }

    #[test]
    fn test_decode_verified_items() {
        let xml = r#"<Envelope><Body><resp><data>
            <item><timeStamp>2020-01-01 00:00:00.0</timeStamp><WL>1.5</WL><sigma>0.01</sigma><I>0</I><F>1</F><R>0</R><T>0</T></item>
            <item><timeStamp>2020-01-01 00:06:00.0</timeStamp><WL>1.6</WL><sigma>0.02</sigma><I>1</I><F>0</F><R>0</R><T>0</T></item>
        </data></resp></Body></Envelope>"#;
        let root = XmlNode::parse(xml).unwrap();
        let records = decode_verified(&root).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].flat_tolerance, 1);
        assert_eq!(records[1].inferred, 1);
        assert_eq!(records[1].water_level, 1.6);
    }

    #[test]
    fn test_decode_stations() {
        let xml = r#"<stations><station ID="Seattle" name="9447130">
            <metadata><location><lat>47.6026</lat><long>-122.3393</long><state>WA</state></location>
            <date_established>1899-01-01</date_established></metadata>
            <parameter name="Water Level" sensorID="A1" DCP="1" status="1"/>
        </station></stations>"#;
        let root = XmlNode::parse(xml).unwrap();
        let stations = decode_stations(&root).unwrap();

        assert_eq!(stations.len(), 1);
        assert_eq!(stations[0].id, "Seattle");
        assert_eq!(stations[0].metadata.date_established, "1899-01-01");
        assert_eq!(stations[0].parameters[0].sensor_id, "A1");
    }

    #[test]
    fn test_decode_high_low() {
        let xml = r#"<HighLowValues><HighLowValues>
            <item><date>01/01/2020</date>
              <data><time>04:12</time><pred>3.2</pred><type>H</type></data>
              <data><time>10:30</time><pred>-0.4</pred><type>LL</type></data>
            </item>
        </HighLowValues></HighLowValues>"#;
        let root = XmlNode::parse(xml).unwrap();
        let days = decode_high_low(&root).unwrap();

        assert_eq!(days.len(), 1);
        assert_eq!(days[0].date, "01/01/2020");
        assert_eq!(days[0].extrema[1].kind, "LL");
    }

    #[test]
    fn test_decode_missing_data_is_error() {
        let root = XmlNode::parse("<Envelope><Body/></Envelope>").unwrap();
        assert!(matches!(decode_verified(&root), Err(UpstreamError::Decode(_))));
    }
}
