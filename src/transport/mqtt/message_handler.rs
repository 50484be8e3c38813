//! Pure event routing for the MQTT network task
//!
//! This module maps raw `rumqttc` events to the handful of outcomes the
//! broker client reacts to. No I/O happens here.

use crate::transport::DeliveryGuarantee;
use rumqttc::{ConnectReturnCode, Event, Outgoing, Packet, QoS};

/// Disconnect code reported when the link drops without the client asking
pub const DISCONNECT_UNEXPECTED: u8 = 1;

/// Disconnect code reported for a client-initiated disconnect
pub const DISCONNECT_REQUESTED: u8 = 0;

/// Pure message routing decisions based on MQTT events
pub struct MessageHandler;

impl MessageHandler {
    /// Route MQTT event to appropriate handler (pure routing decision)
    pub fn route_event(event: &Event) -> EventRoute {
        match event {
            Event::Incoming(incoming) => match incoming {
                Packet::ConnAck(connack) => EventRoute::ConnectionAcknowledged {
                    code: Self::connack_code(connack.code),
                },
                Packet::PubAck(puback) => EventRoute::PublishAcknowledged {
                    message_id: puback.pkid,
                },
                Packet::Disconnect => EventRoute::Disconnected {
                    code: DISCONNECT_UNEXPECTED,
                },
                other => EventRoute::InfrastructureEvent(format!("{other:?}")),
            },
            Event::Outgoing(Outgoing::Disconnect) => EventRoute::Disconnected {
                code: DISCONNECT_REQUESTED,
            },
            Event::Outgoing(_) => EventRoute::OutgoingEvent,
        }
    }

    /// Numeric CONNACK return code as defined by MQTT 3.1.1
    pub fn connack_code(code: ConnectReturnCode) -> u8 {
        match code {
            ConnectReturnCode::Success => 0,
            ConnectReturnCode::RefusedProtocolVersion => 1,
            ConnectReturnCode::BadClientId => 2,
            ConnectReturnCode::ServiceUnavailable => 3,
            ConnectReturnCode::BadUserNamePassword => 4,
            ConnectReturnCode::NotAuthorized => 5,
        }
    }

    /// Map the requested delivery guarantee to a wire QoS level
    pub fn determine_qos(guarantee: DeliveryGuarantee) -> QoS {
        match guarantee {
            DeliveryGuarantee::AtMostOnce => QoS::AtMostOnce,
            DeliveryGuarantee::AtLeastOnce => QoS::AtLeastOnce,
        }
    }
}

/// Routing decisions for MQTT events
#[derive(Debug, Clone, PartialEq)]
pub enum EventRoute {
    /// CONNACK received with the broker's return code
    ConnectionAcknowledged { code: u8 },
    /// QoS 1 publish acknowledged
    PublishAcknowledged { message_id: u16 },
    /// Link closed
    Disconnected { code: u8 },
    /// Other incoming protocol traffic (pings, etc.)
    InfrastructureEvent(String),
    /// Other outgoing packets
    OutgoingEvent,
}
