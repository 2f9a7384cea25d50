//! API handler modules for the comanda HTTP surface.

pub mod catalog;
pub mod dashboard;
pub mod orders;
pub mod session;

use comanda_core::BoardError;
use comanda_remote::RemoteError;
use comanda_types::ApiError;

/// Maps engine errors to the structured API error type.
///
/// Every failing endpoint goes through this mapping so the console always
/// receives a status and a JSON body it can surface; the transition path in
/// particular never fails silently.
pub fn map_board_error(e: BoardError) -> ApiError {
	match e {
		BoardError::OrderNotFound(id) => ApiError::NotFound {
			message: format!("Order {} is not on the board", id),
		},
		BoardError::Forbidden { role, action } => ApiError::Forbidden {
			message: format!("Role {} may not perform {}", role, action),
		},
		BoardError::InvalidTransition { action, from } => ApiError::UnprocessableEntity {
			error_type: "invalid_transition".to_string(),
			message: format!("Action {} is not applicable from status {}", action, from),
		},
		BoardError::Conflict(message) => ApiError::Conflict { message },
		BoardError::Remote(remote) => map_remote_error(remote),
		BoardError::Config(message)
		| BoardError::Storage(message)
		| BoardError::Internal(message) => ApiError::Internal { message },
	}
}

/// Maps remote backend errors to the structured API error type.
pub fn map_remote_error(e: RemoteError) -> ApiError {
	match e {
		RemoteError::Timeout => ApiError::GatewayTimeout {
			message: "The backend did not answer in time".to_string(),
		},
		RemoteError::Conflict(message) => ApiError::Conflict { message },
		RemoteError::Validation { status, message } => ApiError::BadGateway {
			message: format!("Backend rejected the request ({}): {}", status, message),
		},
		RemoteError::Server { status, message } => ApiError::BadGateway {
			message: format!("Backend error ({}): {}", status, message),
		},
		RemoteError::Network(message) => ApiError::BadGateway {
			message: format!("Backend unreachable: {}", message),
		},
		RemoteError::Serialization(message) => ApiError::BadGateway {
			message: format!("Backend sent an unreadable response: {}", message),
		},
		RemoteError::Configuration(message) => ApiError::Internal { message },
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use comanda_types::{ActionKind, OrderStatus, Role};

	#[test]
	fn board_errors_map_to_expected_statuses() {
		assert_eq!(
			map_board_error(BoardError::OrderNotFound(9)).status_code(),
			404
		);
		assert_eq!(
			map_board_error(BoardError::Forbidden {
				role: Role::Cocinero,
				action: ActionKind::Cancel,
			})
			.status_code(),
			403
		);
		assert_eq!(
			map_board_error(BoardError::InvalidTransition {
				action: ActionKind::SendToKitchen,
				from: OrderStatus::Pending,
			})
			.status_code(),
			422
		);
		assert_eq!(
			map_board_error(BoardError::Conflict("stale".into())).status_code(),
			409
		);
		assert_eq!(
			map_board_error(BoardError::Storage("broken".into())).status_code(),
			500
		);
	}

	#[test]
	fn remote_errors_map_to_gateway_statuses() {
		assert_eq!(map_remote_error(RemoteError::Timeout).status_code(), 504);
		assert_eq!(
			map_remote_error(RemoteError::Network("down".into())).status_code(),
			502
		);
		assert_eq!(
			map_remote_error(RemoteError::Server {
				status: 500,
				message: "boom".into(),
			})
			.status_code(),
			502
		);
		assert_eq!(
			map_remote_error(RemoteError::Conflict("stale".into())).status_code(),
			409
		);
	}
}
