//! Sensor-node service — distance, weight and motion publisher.
//!
//! The node has no rules of its own.  Each tick reads its sensors, clamps
//! failures to zero and publishes the readings for the gateway.
//!
//! ```text
//!  RangePort  ──▶ ┌──────────────────────┐
//!  WeightPort ──▶ │  SensorNodeService   │ ──▶ BrokerPort
//!  FramePort? ──▶ │ filter · frame diff  │ ──▶ EventSink
//!                 └──────────────────────┘
//! ```

use log::{debug, info, warn};

use crate::config::NodeConfig;
use crate::connectivity::LinkState;
use crate::sensors::load_cell::WeightFilter;
use crate::sensors::motion::FrameDiffDetector;
use crate::telemetry::{clamp_reading, format_flag, format_reading};
use crate::topics::{TopicKind, TopicMap};

use super::events::{AppEvent, Channel};
use super::ports::{BrokerPort, EventSink, FramePort, RangePort, WeightPort};

/// Values published in one round.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NodeReadings {
    pub distance_cm: f32,
    pub weight_g: f32,
    /// `None` when no camera is fitted.
    pub motion: Option<bool>,
}

pub struct SensorNodeService {
    topics: TopicMap,
    filter: WeightFilter,
    detector: FrameDiffDetector,
    frame: Vec<u8>,
    broker: LinkState,
}

impl SensorNodeService {
    pub fn new(config: &NodeConfig) -> Self {
        let m = config.motion;
        Self {
            topics: TopicMap::new(config.namespace),
            filter: WeightFilter::new(config.load_cell.window),
            detector: FrameDiffDetector::new(m),
            frame: vec![0; m.width * m.height],
            broker: LinkState::Down,
        }
    }

    pub fn start(&mut self, sink: &mut impl EventSink) {
        sink.emit(&AppEvent::Started("sensor-node"));
        info!("SensorNodeService started ({:?} topics)", self.topics.namespace());
    }

    /// One publish round.  `camera` is `None` on nodes without a camera;
    /// the motion topic is then never published.
    pub fn tick(
        &mut self,
        hw: &mut (impl RangePort + WeightPort),
        camera: Option<&mut dyn FramePort>,
        broker: &mut impl BrokerPort,
        sink: &mut impl EventSink,
        now_ms: u64,
    ) -> NodeReadings {
        let link = broker.maintain(now_ms);
        if link != self.broker {
            self.broker = link;
            sink.emit(&AppEvent::ConnectivityChanged(link));
        }

        let distance_cm = match hw.distance_cm() {
            Ok(cm) => clamp_reading(cm),
            Err(e) => {
                warn!("TELEM | distance read failed: {}", e);
                sink.emit(&AppEvent::SensorFault(e));
                0.0
            }
        };

        // Failed conversions publish zero but stay out of the average.
        let weight_g = match hw.weight_g() {
            Ok(g) => self.filter.push(clamp_reading(g)),
            Err(e) => {
                warn!("TELEM | weight read failed: {}", e);
                sink.emit(&AppEvent::SensorFault(e));
                0.0
            }
        };

        let motion = camera.map(|cam| self.detect_motion(cam, sink));

        let readings = NodeReadings { distance_cm, weight_g, motion };
        sink.emit(&AppEvent::NodeTelemetry { distance_cm, weight_g, motion });

        if self.broker.is_up() {
            self.publish(broker, sink, TopicKind::Ultrasonic, &format_reading(distance_cm));
            self.publish(broker, sink, TopicKind::Weight, &format_reading(weight_g));
            if let Some(m) = motion {
                self.publish(broker, sink, TopicKind::Motion, format_flag(m));
            }
        } else {
            debug!("PUB | broker down, readings not sent");
        }

        readings
    }

    fn detect_motion(&mut self, camera: &mut dyn FramePort, sink: &mut impl EventSink) -> bool {
        let captured = camera
            .capture(&mut self.frame)
            .and_then(|()| self.detector.update(&self.frame));
        match captured {
            Ok(moved) => moved,
            Err(e) => {
                warn!("TELEM | motion frame failed: {}", e);
                sink.emit(&AppEvent::SensorFault(e));
                false
            }
        }
    }

    fn publish(&self, broker: &mut impl BrokerPort, sink: &mut impl EventSink, kind: TopicKind, payload: &str) {
        let topic = self.topics.path(kind);
        if let Err(e) = broker.publish(topic, payload) {
            warn!("PUB | {} failed: {}", topic, e);
            sink.emit(&AppEvent::DeliveryFailed { channel: Channel::Broker, error: e });
        }
    }

    pub fn broker_state(&self) -> LinkState {
        self.broker
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MotionConfig;
    use crate::error::{CommsError, SensorError};

    struct Bench {
        distance: Result<f32, SensorError>,
        weight: Result<f32, SensorError>,
    }

    impl RangePort for Bench {
        fn distance_cm(&mut self) -> Result<f32, SensorError> {
            self.distance
        }
    }

    impl WeightPort for Bench {
        fn weight_g(&mut self) -> Result<f32, SensorError> {
            self.weight
        }
    }

    #[derive(Default)]
    struct Broker {
        sent: Vec<(String, String)>,
    }

    impl BrokerPort for Broker {
        fn maintain(&mut self, _now_ms: u64) -> LinkState {
            LinkState::Up
        }
        fn subscribe(&mut self, _topic: &str) -> Result<(), CommsError> {
            Ok(())
        }
        fn publish(&mut self, topic: &str, payload: &str) -> Result<(), CommsError> {
            self.sent.push((topic.to_owned(), payload.to_owned()));
            Ok(())
        }
        fn poll(&mut self, _handler: &mut dyn FnMut(&str, &[u8])) {}
    }

    struct Frames(u8);

    impl FramePort for Frames {
        fn capture(&mut self, buf: &mut [u8]) -> Result<(), SensorError> {
            buf.fill(self.0);
            self.0 = self.0.wrapping_add(100);
            Ok(())
        }
    }

    #[derive(Default)]
    struct Events(Vec<AppEvent>);

    impl EventSink for Events {
        fn emit(&mut self, event: &AppEvent) {
            self.0.push(event.clone());
        }
    }

    fn small_config() -> NodeConfig {
        NodeConfig {
            motion: MotionConfig { width: 4, height: 4, pixel_delta: 10, changed_pixels: 3 },
            ..NodeConfig::default()
        }
    }

    #[test]
    fn publishes_distance_and_weight_without_camera() {
        let mut svc = SensorNodeService::new(&small_config());
        let mut hw = Bench { distance: Ok(7.5), weight: Ok(120.0) };
        let mut broker = Broker::default();
        let r = svc.tick(&mut hw, None, &mut broker, &mut Events::default(), 0);

        assert_eq!(r, NodeReadings { distance_cm: 7.5, weight_g: 120.0, motion: None });
        assert_eq!(
            broker.sent,
            vec![
                ("@msg/alias/ultrasonic".to_owned(), "7.50".to_owned()),
                ("@msg/alias/weight".to_owned(), "120.00".to_owned()),
            ]
        );
    }

    #[test]
    fn failed_reads_publish_zero() {
        let mut svc = SensorNodeService::new(&small_config());
        let mut hw = Bench { distance: Err(SensorError::EchoTimeout), weight: Err(SensorError::NotReady) };
        let mut events = Events::default();
        let r = svc.tick(&mut hw, None, &mut Broker::default(), &mut events, 0);
        assert_eq!((r.distance_cm, r.weight_g), (0.0, 0.0));
        assert!(events.0.contains(&AppEvent::SensorFault(SensorError::EchoTimeout)));
        assert!(events.0.contains(&AppEvent::SensorFault(SensorError::NotReady)));
    }

    #[test]
    fn weight_is_smoothed_and_failures_skip_the_window() {
        let mut svc = SensorNodeService::new(&small_config());
        let mut broker = Broker::default();
        let mut events = Events::default();
        let mut hw = Bench { distance: Ok(10.0), weight: Ok(100.0) };
        svc.tick(&mut hw, None, &mut broker, &mut events, 0);
        hw.weight = Err(SensorError::NotReady);
        svc.tick(&mut hw, None, &mut broker, &mut events, 1);
        hw.weight = Ok(200.0);
        let r = svc.tick(&mut hw, None, &mut broker, &mut events, 2);
        assert_eq!(r.weight_g, 150.0);
    }

    #[test]
    fn camera_adds_motion_topic() {
        let mut svc = SensorNodeService::new(&small_config());
        let mut hw = Bench { distance: Ok(1.0), weight: Ok(1.0) };
        let mut cam = Frames(0);
        let mut broker = Broker::default();
        let mut events = Events::default();

        let first = svc.tick(&mut hw, Some(&mut cam), &mut broker, &mut events, 0);
        assert_eq!(first.motion, Some(false), "first frame only primes");
        let second = svc.tick(&mut hw, Some(&mut cam), &mut broker, &mut events, 1);
        assert_eq!(second.motion, Some(true));
        assert_eq!(broker.sent.last(), Some(&("@msg/alias/motion".to_owned(), "1".to_owned())));
    }
}
