// Life of a delivery:
// 1. Event Grid calls one of the webhook routes with a bearer token
// 2. The token header is read (unverified) to find the signing key id
// 3. The tenant's discovery document gives the issuer and key set location
// 4. The signing key is fetched and the token verified (RS256, audience, issuer)
// 5. Only then is the handshake answered or the delivery accepted
//
// System components:
//  - Token verifier (auth)
//  - Event Grid payload handling
//  - HTTP routes

pub mod auth;
pub mod config;
pub mod eventgrid;
pub mod routes;

#[cfg(test)]
mod e2e_tests;
