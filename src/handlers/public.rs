//! Pages reachable without signing in: home and signup, about, contact,
//! login/logout/verification, and password reset.

use crate::app::{App, Request, Response};
use crate::auth::{KIND_RESET_PASSWORD, KIND_VERIFY_EMAIL};
use crate::db::{insert, is_constraint_violation, query_one};
use crate::forms::{contact_form, request_reset_form, reset_password_form, signin_form, signup_form};
use crate::mailer::{contact_email, reset_password_email, verification_email};
use crate::models::User;
use crate::pages;
use crate::session::Session;

pub const SIGNUP_THANKS_MESSAGE: &str =
    "Thanks for signing up! Please follow the verification link you've been emailed to get started.";
pub const DUPLICATE_EMAIL_MESSAGE: &str =
    "Looks like that email's already in use. Try logging in above?";
pub const SIGNUP_MAIL_FAILED_MESSAGE: &str =
    "Looks like something went wrong with our email provider. Please try again later.";
pub const PASSWORDS_MUST_MATCH_MESSAGE: &str = "Passwords must match.";
pub const BAD_CREDENTIALS_MESSAGE: &str = "Those credentials were incorrect.";
pub const INVALID_LOGIN_MESSAGE: &str = "Sorry, your login credentials were invalid.";
pub const VERIFIED_MESSAGE: &str = "You're all set to go! Go ahead and log in above.";
pub const BAD_VERIFY_LINK_MESSAGE: &str = "Sorry, that verification link isn't valid.";
pub const UNKNOWN_EMAIL_MESSAGE: &str = "We don't have a record of that email address.";
pub const RESET_SENT_MESSAGE: &str = "OK, check your inbox for the reset email.";
pub const BAD_RESET_LINK_MESSAGE: &str = "Sorry, that URL isn't valid.";
pub const PASSWORD_RESET_MESSAGE: &str = "Your password has been reset! Go ahead and log in above.";

/// Home page; a POST is a signup.
pub fn home(app: &App, request: &Request, session: &mut Session) -> Response {
    let mut form = signup_form();
    if !request.is_post() {
        let page = pages::home_page(session, form);
        return app.render(session, &page);
    }

    form.populate(&request.form);
    let valid = form.validate(&app.csrf_context(session));
    let passwords_match = request.form.value("password") == request.form.value("repeatPassword");

    if !passwords_match {
        form.add_error(PASSWORDS_MUST_MATCH_MESSAGE);
        form.clear("password");
        form.clear("repeatPassword");
    } else if valid {
        signup(app, session, request.form.value("email"), request.form.value("password"));
        form = signup_form();
    }

    let page = pages::home_page(session, form);
    app.render(session, &page)
}

/// Creates the account, then sends its verification email. A failed send
/// removes the new account again.
fn signup(app: &App, session: &mut Session, email: &str, password: &str) {
    let user = match User::new(email, password) {
        Ok(user) => user,
        Err(e) => {
            tracing::error!("User creation error: {}", e);
            session.add_flash("Sorry, we're having trouble saving that password.");
            return;
        }
    };

    let settings = app.settings();
    let message = match verification_email(
        app.signer(),
        &settings.base_url,
        &settings.site_inbox,
        &user.email,
    ) {
        Ok(message) => message,
        Err(e) => {
            tracing::error!("Failed to build verification email for {}: {}", user.email, e);
            session.add_flash(SIGNUP_MAIL_FAILED_MESSAGE);
            return;
        }
    };

    match app.db().transaction(|tx| insert(tx, &user)) {
        Ok(_) => {}
        Err(e) if is_constraint_violation(&e) => {
            tracing::warn!("Duplicate user: {}", user.email);
            session.add_flash(DUPLICATE_EMAIL_MESSAGE);
            return;
        }
        Err(e) => {
            tracing::error!("Error inserting user: {:#}", e);
            session.add_flash("Something went wrong with our database. Still getting all the kinks out!");
            return;
        }
    }

    if app.send_mail(&message).is_err() {
        if let Err(e) = app.db().transaction(|tx| User::delete_unverified(tx, &user.email)) {
            tracing::error!("Failed to remove unverified user {}: {:#}", user.email, e);
        }
        session.add_flash(SIGNUP_MAIL_FAILED_MESSAGE);
        return;
    }

    tracing::info!("New user {}", user.email);
    session.add_flash(SIGNUP_THANKS_MESSAGE);
}

pub fn about(app: &App, _request: &Request, session: &mut Session) -> Response {
    let page = pages::about_page(session);
    app.render(session, &page)
}

pub fn contact(app: &App, request: &Request, session: &mut Session) -> Response {
    let mut form = contact_form();
    if request.is_post() {
        form.populate(&request.form);
        if form.validate(&app.csrf_context(session)) {
            let message = contact_email(
                &app.settings().site_inbox,
                request.form.value("email"),
                request.form.value("message"),
            );
            match app.send_mail(&message) {
                Ok(()) => {
                    tracing::info!("Contact form message sent");
                    session.add_flash("Thanks for the note!");
                    form = contact_form();
                }
                Err(_) => session.add_flash("Hm, looks like that didn't go through."),
            }
        }
    }

    let page = pages::contact_page(session, form);
    app.render(session, &page)
}

/// `/auth?action=login|logout|verify`, then on to `next` or the dashboard.
pub fn auth(app: &App, request: &Request, session: &mut Session) -> Response {
    match (request.query.value("action"), request.is_post()) {
        ("login", true) => login(app, request, session),
        ("logout", false) => session.clear_user(),
        ("verify", false) => verify(app, request, session),
        (action, _) => tracing::info!("Ignoring auth action {:?}", action),
    }

    match request.query.get("next") {
        Some(next) if next.starts_with('/') && !next.starts_with("//") => Response::redirect(next),
        _ => app.redirect_to("dashboard"),
    }
}

fn login(app: &App, request: &Request, session: &mut Session) {
    let mut form = signin_form();
    form.populate(&request.form);
    if !form.validate(&app.csrf_context(session)) {
        session.add_flash(BAD_CREDENTIALS_MESSAGE);
        return;
    }

    let email = request.form.value("email");
    let user = app
        .read(|conn| query_one(conn, &User::by_email(email)))
        .unwrap_or_else(|e| {
            tracing::error!("Failed to look up {}: {:#}", email, e);
            None
        });

    match user {
        Some(user) if user.verified => {
            if user.check_password(request.form.value("password")) {
                tracing::info!("{} logged in", user.email);
                session.set_user(&user.email);
            } else {
                session.add_flash(INVALID_LOGIN_MESSAGE);
            }
        }
        _ => {
            tracing::info!("Could not find verified user {}", email);
            session.add_flash(BAD_CREDENTIALS_MESSAGE);
        }
    }
}

fn verify(app: &App, request: &Request, session: &mut Session) {
    let email = request
        .query
        .get("token")
        .and_then(|token| app.signer().verify(KIND_VERIFY_EMAIL, token).ok());
    let Some(email) = email else {
        session.add_flash(BAD_VERIFY_LINK_MESSAGE);
        return;
    };

    let verified = app.db().transaction(|tx| {
        let user = query_one(tx, &User::by_email(&email))?;
        if user.is_none() {
            return Ok(false);
        }
        User::mark_verified(tx, &email)?;
        Ok(true)
    });

    match verified {
        Ok(true) => session.add_flash(VERIFIED_MESSAGE),
        Ok(false) => session.add_flash(BAD_VERIFY_LINK_MESSAGE),
        Err(e) => {
            tracing::error!("Failed to verify {}: {:#}", email, e);
            session.add_flash("Looks like there was a database error verifying your email. Ugh!");
        }
    }
}

/// `/reset?action=request-reset|reset`.
pub fn reset(app: &App, request: &Request, session: &mut Session) -> Response {
    match request.query.value("action") {
        "request-reset" => request_reset(app, request, session),
        "reset" => reset_password(app, request, session),
        _ => app.redirect_to("home"),
    }
}

fn request_reset(app: &App, request: &Request, session: &mut Session) -> Response {
    let mut form = request_reset_form();
    if request.is_post() {
        form.populate(&request.form);
        if form.validate(&app.csrf_context(session)) {
            let email = request.form.value("email");
            let user = app
                .read(|conn| query_one(conn, &User::by_email(email)))
                .unwrap_or_else(|e| {
                    tracing::error!("Failed to look up {}: {:#}", email, e);
                    None
                });
            let Some(user) = user else {
                session.add_flash(UNKNOWN_EMAIL_MESSAGE);
                return app.redirect_to("home");
            };

            let settings = app.settings();
            let sent = reset_password_email(
                app.signer(),
                &settings.base_url,
                &settings.site_inbox,
                &user.email,
                settings.reset_max_age_minutes,
            )
            .and_then(|message| app.send_mail(&message));
            session.add_flash(match sent {
                Ok(()) => RESET_SENT_MESSAGE,
                Err(_) => {
                    "Sorry, something went wrong with our email provider. Please try again later."
                }
            });
            return app.redirect_to("home");
        }
    }

    let page = pages::request_reset_page(session, form);
    app.render(session, &page)
}

fn reset_password(app: &App, request: &Request, session: &mut Session) -> Response {
    let token = request.query.value("token");
    let email = app.signer().verify_timestamped(
        KIND_RESET_PASSWORD,
        token,
        app.settings().reset_max_age_minutes,
    );
    let Ok(email) = email else {
        session.add_flash(BAD_RESET_LINK_MESSAGE);
        return app.redirect_to("home");
    };

    let mut form = reset_password_form();
    if request.is_post() {
        form.populate(&request.form);
        let valid = form.validate(&app.csrf_context(session));
        let new_password = request.form.value("newPassword");
        let passwords_match = new_password == request.form.value("repeatPassword");

        if valid && passwords_match {
            let updated = app
                .db()
                .transaction(|tx| User::update_password(tx, &email, new_password));
            match updated {
                Ok(()) => session.add_flash(PASSWORD_RESET_MESSAGE),
                Err(e) => {
                    tracing::error!("Failed to reset password for {}: {:#}", email, e);
                    session.add_flash(
                        "Looks like there was a database error resetting your password. Ugh!",
                    );
                }
            }
            return app.redirect_to("home");
        }
        if !passwords_match {
            form.add_error("The passwords must match.");
        }
    }

    let page = pages::reset_password_page(session, form, token);
    app.render(session, &page)
}
