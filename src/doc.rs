use crate::routes::{couples::*, invites::models::*, invites::*};
use crate::utils::pairing::models::{Couple, InvitePreview, IssuedInvite};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
info(title = "Couple Link", description = "Couple pairing through invite codes"),
paths(
post_couple,
get_own_couple,
create_invitation,
redeem_invitation,
preview_invitation,
),
components(schemas(
Couple,
CreateInvite,
IssuedInvite,
InvitePreview,
RedeemInvite,
RedeemResult,
)),
tags((name = "couples"), (name = "invites"))
)]
pub struct ApiDoc;
